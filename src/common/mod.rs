#[cfg(test)]
pub(crate) mod fake;
pub(crate) mod gatekeeper;
pub(crate) mod session_manager;
pub(crate) mod util;
