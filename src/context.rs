use crate::functions::Registry;

/// Per-search options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Function table to resolve calls against. `None` means the builtins.
    pub custom_functions: Option<Registry>,
}

impl SearchOptions {
    pub fn with_functions(functions: Registry) -> Self {
        Self {
            custom_functions: Some(functions),
        }
    }
}
