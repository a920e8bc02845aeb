//! Health-check naming convention: `<service>-<component>`, e.g. `foo-web`.

/// A check name split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckName {
    pub service: String,
    /// Empty when the name has no separator.
    pub component: String,
}

/// Split `name` on the first `-`. Any string is accepted.
pub fn split_check_name(name: &str) -> CheckName {
    let (service, component) = name.split_once('-').unwrap_or((name, ""));
    CheckName {
        service: service.to_owned(),
        component: component.to_owned(),
    }
}
