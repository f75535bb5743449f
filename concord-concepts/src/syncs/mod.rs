//! Sync rules of the file-sharing application
//!
//! Each HTTP-style route is one request rule that authorizes and dispatches
//! the concept action, plus response rules correlating the action's
//! completion with the original request through the `request` variable.

pub mod files;
pub mod sharing;

use concord_engine::{lit, var, ActionInvocation, ActionPattern, Result, SyncRule};

/// Every rule of the application, in registration order
pub fn all() -> Result<Vec<SyncRule>> {
    let mut rules = files::rules()?;
    rules.extend(sharing::rules()?);
    Ok(rules)
}

/// `Requesting.request` on `path`, capturing the request id
pub(crate) fn request_on(path: &str) -> ActionPattern {
    ActionPattern::new("Requesting", "request")
        .input("path", lit(path))
        .output("request", var("request"))
}

/// `Requesting.respond` to the captured request
pub(crate) fn respond() -> ActionInvocation {
    ActionInvocation::new("Requesting", "respond").arg("request", var("request"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_names_are_unique() {
        let rules = all().unwrap();
        assert_eq!(rules.len(), 12);
        let names: HashSet<_> = rules.iter().map(SyncRule::name).collect();
        assert_eq!(names.len(), rules.len());
    }
}
