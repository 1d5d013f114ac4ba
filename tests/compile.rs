use cardc::{
  CompileError, Compiler, CompilerConfig, Limitation, Primitive, RenderedInput, RenderedStep,
  compile,
};

fn listing(source: &str) -> Vec<String> {
  compile(source)
    .unwrap()
    .iter()
    .map(ToString::to_string)
    .collect()
}

fn primitives(steps: &[RenderedStep]) -> Vec<Primitive> {
  steps.iter().map(|step| step.primitive).collect()
}

fn count(steps: &[RenderedStep], primitive: Primitive) -> usize {
  steps.iter().filter(|step| step.primitive == primitive).count()
}

#[test]
fn single_call_on_input_is_just_the_card() {
  let steps = compile("f(in) := g(in)").unwrap();
  assert_eq!(steps.len(), 1);
  assert_eq!(steps[0].name, "f");
  assert_eq!(steps[0].primitive, Primitive::OpByName);
  assert_eq!(steps[0].inputs, vec![RenderedInput::Text("\"g\"".to_string())]);
  assert!(steps[0].is_final);
}

#[test]
fn static_second_argument_is_flipped_then_applied() {
  assert_eq!(
    listing("f(in) := pair(in, \"x\")"),
    vec![
      "op_pair_1 := op_by_name(\"pair\")",
      "str_lit_1 := String(\"x\")  # static string card",
      "flipped_1 := flip(op_pair_1)",
      "f := apply(flipped_1, str_lit_1)  # curry 'pair': bind argument 1 to \"x\"; final composite operator",
    ]
  );
}

#[test]
fn mixed_static_and_nested_dynamic_arguments() {
  let source = r#"
    ultimate_test(in) := listGetOrDefault(
      in,
      var_default_idx,
      itemstackSize(
        heldItem(in)
      )
    )
  "#;
  assert_eq!(
    listing(source),
    vec![
      "op_listGetOrDefault_1 := op_by_name(\"listGetOrDefault\")",
      "flipped_1 := flip(op_listGetOrDefault_1)",
      "curried_1 := apply(flipped_1, var_default_idx)  # curry 'listGetOrDefault': bind argument 1 to var_default_idx",
      "op_identity_1 := op_by_name(\"identity\")",
      "op_itemstackSize_1 := op_by_name(\"itemstackSize\")",
      "op_heldItem_1 := op_by_name(\"heldItem\")",
      "piped_1 := pipe(op_heldItem_1, op_itemstackSize_1)",
      "ultimate_test := pipe2(op_identity_1, piped_1, curried_1)  # final composite operator",
    ]
  );
}

#[test]
fn two_dynamic_arguments_compose_with_one_pipe2() {
  let steps = compile("func(in) := booleanOr(itemstackIsEnchanted(in), itemstackIsStackable(in))")
    .unwrap();
  assert_eq!(
    primitives(&steps),
    vec![Primitive::OpByName, Primitive::OpByName, Primitive::OpByName, Primitive::Pipe2]
  );

  let last = steps.last().unwrap();
  assert_eq!(last.name, "func");
  assert_eq!(
    last.inputs,
    vec![
      RenderedInput::Ref {
        step: 1,
        name: "op_itemstackIsEnchanted_1".to_string()
      },
      RenderedInput::Ref {
        step: 2,
        name: "op_itemstackIsStackable_1".to_string()
      },
      RenderedInput::Ref {
        step: 0,
        name: "op_booleanOr_1".to_string()
      },
    ]
  );
}

#[test]
fn pipe2_inputs_follow_argument_order() {
  let steps = compile("f(in) := cmp(b(in), a(in))").unwrap();
  let last = steps.last().unwrap().to_string();
  assert_eq!(last, "f := pipe2(op_b_1, op_a_1, op_cmp_1)  # final composite operator");
}

#[test]
fn repeated_subexpressions_compile_once() {
  let steps = compile("f(in) := and(isA(lower(in)), isB(lower(in)))").unwrap();
  assert_eq!(
    steps.iter().filter(|step| step.to_string().contains("op_by_name(\"lower\")")).count(),
    1
  );
  assert_eq!(count(&steps, Primitive::Pipe), 2);

  let lower = steps
    .iter()
    .position(|step| step.name == "op_lower_1")
    .unwrap();
  let references = steps
    .iter()
    .flat_map(|step| &step.inputs)
    .filter(|input| matches!(input, RenderedInput::Ref { step, .. } if *step == lower))
    .count();
  assert_eq!(references, 2);
}

#[test]
fn repeated_static_values_share_one_literal() {
  let steps = compile("f(in) := g(in, join('a', 'a'))").unwrap();
  assert_eq!(count(&steps, Primitive::String), 1);
  let join = steps.iter().find(|step| step.primitive == Primitive::Apply2).unwrap();
  assert_eq!(join.to_string(), "join_val_1 := apply2(op_join_1, str_lit_1, str_lit_1)");
}

#[test]
fn every_surviving_step_is_used() {
  let sources = [
    "f(in) := pair(in, \"x\")",
    "f(in) := g(in)",
    "f(in) := h(1, in, k(in, true))",
    "f(in) := h('a')",
    "f(in) := cmp(b(in), a(in))",
  ];
  for source in sources {
    let steps = compile(source).unwrap();
    let (last, rest) = steps.split_last().unwrap();
    assert!(last.is_final, "{source}");
    for (position, _) in rest.iter().enumerate() {
      let used = steps.iter().flat_map(|step| &step.inputs).any(
        |input| matches!(input, RenderedInput::Ref { step, .. } if *step == position),
      );
      assert!(used, "{source}: step {position} is dead");
    }
  }
}

#[test]
fn references_point_backwards() {
  let steps = compile("f(in) := h(1, in, k(in, true))").unwrap();
  for (position, step) in steps.iter().enumerate() {
    for input in &step.inputs {
      if let RenderedInput::Ref { step: target, name } = input {
        assert!(*target < position);
        assert_eq!(&steps[*target].name, name);
      }
    }
  }
}

#[test]
fn compilation_is_deterministic() {
  let source = "f(in) := h(1, in, k(in, 'x', 2.5))";
  let first = compile(source).unwrap();
  let second = compile(source).unwrap();
  assert_eq!(first, second);

  let mut reused = Compiler::default();
  reused.compile("other(in) := a(b(in), c(in))").unwrap();
  assert_eq!(reused.compile(source).unwrap(), first);
}

#[test]
fn literals_materialize_once_each() {
  let cases = [
    ("\"abc\"", Primitive::String, "String(\"abc\")"),
    ("42", Primitive::Integer, "Integer(42)"),
    ("3.5", Primitive::Double, "Double(3.5)"),
    ("true", Primitive::Boolean, "Boolean(true)"),
  ];
  for (literal, primitive, rendered) in cases {
    let steps = compile(&format!("f(in) := g(in, {literal})")).unwrap();
    let materialized: Vec<_> = steps
      .iter()
      .filter(|step| {
        matches!(
          step.primitive,
          Primitive::String | Primitive::Integer | Primitive::Double | Primitive::Boolean
        )
      })
      .collect();
    assert_eq!(materialized.len(), 1, "{literal}");
    assert_eq!(materialized[0].primitive, primitive);
    assert!(materialized[0].to_string().contains(rendered), "{literal}");
  }
}

#[test]
fn static_argument_first_needs_no_flip() {
  let steps = compile("f(in) := startsWith('abc', in)").unwrap();
  assert_eq!(count(&steps, Primitive::Flip), 0);
  assert_eq!(count(&steps, Primitive::Apply), 1);
}

#[test]
fn static_argument_two_slots_away_is_rejected() {
  let err = compile("f(in) := clamp(in, in, 10)").unwrap_err();
  assert!(err.is_capability());
  assert_eq!(
    err.limitation(),
    Some(Limitation::FlipDistance {
      index: 2,
      position: 2
    })
  );
  assert!(err.to_string().contains("'clamp'"));
}

#[test]
fn each_static_argument_after_one_dynamic_flips_once() {
  let steps = compile("f(in) := clamp(in, 0, 10)").unwrap();
  assert_eq!(count(&steps, Primitive::Flip), 2);
  assert_eq!(count(&steps, Primitive::Apply), 2);
}

#[test]
fn three_dynamic_arguments_are_rejected() {
  let err = compile("f(in) := triple(a(in), b(in), c(in))").unwrap_err();
  assert_eq!(err.limitation(), Some(Limitation::DynamicArity { count: 3 }));
}

#[test]
fn four_static_arguments_are_rejected() {
  let err = compile("f(in) := g(in, h(1, 2, 3, 4))").unwrap_err();
  assert!(matches!(
    err,
    CompileError::Capability {
      ref operator,
      limit: Limitation::StaticArity { count: 4 },
    } if operator == "h"
  ));
}

#[test]
fn static_calls_pick_apply_by_arity() {
  let steps = compile("f(in) := g(in, a(), c(x, y), d(x, y, z))").unwrap();
  for primitive in [Primitive::Apply0, Primitive::Apply2, Primitive::Apply3] {
    assert_eq!(count(&steps, primitive), 1, "{primitive}");
  }
  let apply0 = steps.iter().find(|step| step.primitive == Primitive::Apply0).unwrap();
  assert_eq!(apply0.to_string(), "a_val_1 := apply0(op_a_1)");
}

#[test]
fn format_errors() {
  for source in [
    "f(x) := g(x)",
    "f(in) g(in)",
    "f(in) := g(in",
    "f(in) := g(in))",
    "f(in) := ",
    "f(in) := g(in) h",
    "f(in) := g(@)",
    "",
  ] {
    let err = compile(source).unwrap_err();
    assert!(err.is_format(), "{source}: {err}");
  }
}

#[test]
fn format_error_shows_offending_snippet() {
  let err = compile("f(in) := g(in))").unwrap_err();
  assert_eq!(
    err.to_string(),
    "'f(in) := g(in))'\n               ^ unexpected token \")\""
  );
}

#[test]
fn comments_can_be_disabled() {
  let config = CompilerConfig::default().with_comments(false);
  let steps = Compiler::new(config)
    .compile("f(in) := pair(in, \"x\")")
    .unwrap();
  assert!(steps.iter().all(|step| step.comment.is_none()));
  assert_eq!(steps.last().unwrap().to_string(), "f := apply(flipped_1, str_lit_1)");
}

#[test]
fn constant_card_name_is_configurable() {
  let config = CompilerConfig::default().with_constant_card("always");
  let steps = Compiler::new(config).compile("f(in) := 7").unwrap();
  let lines: Vec<String> = steps.iter().map(ToString::to_string).collect();
  assert_eq!(
    lines,
    vec![
      "int_lit_1 := Integer(7)  # static integer card",
      "op_always_1 := op_by_name(\"always\")",
      "f := apply(op_always_1, int_lit_1)  # operator that always returns 7; final composite operator",
    ]
  );
}

#[test]
fn integer_literals_have_no_range_limit() {
  let digits = "1234567890123456789012345";
  let steps = compile(&format!("f(in) := g(in, {digits})")).unwrap();
  assert_eq!(count(&steps, Primitive::Integer), 1);
  let literal = steps
    .iter()
    .find(|step| step.primitive == Primitive::Integer)
    .unwrap();
  assert_eq!(literal.inputs, vec![RenderedInput::Text(digits.to_string())]);
}

#[test]
fn format_error_on_a_later_line_points_into_that_line() {
  let err = compile("f(in) :=\n  g(in, @)").unwrap_err();
  assert_eq!(err.to_string(), "'  g(in, @)'\n         ^ invalid token: '@'");
}
