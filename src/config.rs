//! Compiler settings that outlive a single compile.

/// Names of the engine-side helper cards plus output options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
  /// Card looked up for a bare `in`.
  pub identity_card: String,
  /// Card used to lift an input-independent body into an operator.
  pub constant_card: String,
  /// Attach explanatory comments to rendered steps.
  pub comments: bool,
}

impl Default for CompilerConfig {
  fn default() -> Self {
    Self {
      identity_card: "identity".to_string(),
      constant_card: "constant".to_string(),
      comments: true,
    }
  }
}

impl CompilerConfig {
  pub fn with_identity_card(mut self, name: impl Into<String>) -> Self {
    self.identity_card = name.into();
    self
  }

  pub fn with_constant_card(mut self, name: impl Into<String>) -> Self {
    self.constant_card = name.into();
    self
  }

  pub fn with_comments(mut self, comments: bool) -> Self {
    self.comments = comments;
    self
  }
}
