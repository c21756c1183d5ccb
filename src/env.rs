use std::{cell::RefCell, ffi::OsStr};

/// Set to `1` to suppress status messages, same as `--minimal`.
pub const MINIMAL_VAR: &str = "LC3VM_MINIMAL";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Env {
    pub minimal: bool,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

impl Env {
    pub fn from_vars() -> Self {
        Env {
            minimal: var_is(MINIMAL_VAR, "1"),
        }
    }
}

/// Read configuration from the process environment. Must only be called once.
pub fn init() {
    set_env(Env::from_vars());
}

pub fn is_minimal() -> bool {
    with_env(|env| env.minimal)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_is_false() {
        assert!(!var_is("LC3VM_TEST_SURELY_UNSET", "1"));
    }

    #[test]
    fn variable_must_match_exactly() {
        std::env::set_var("LC3VM_TEST_VAR_IS", "1");
        assert!(var_is("LC3VM_TEST_VAR_IS", "1"));
        assert!(!var_is("LC3VM_TEST_VAR_IS", "true"));
    }
}
