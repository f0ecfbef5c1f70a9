//! Component name derivation

/// Name used when nothing usable can be derived
pub const FALLBACK_NAME: &str = "ExtractedComponent";

/// Identifiers a generated component must not shadow
const RESERVED: &[&str] = &[
    "Array", "Boolean", "Component", "Date", "Document", "Element", "Error", "Event",
    "Fragment", "Function", "Image", "Map", "Node", "Number", "Object", "Promise", "Props",
    "React", "Set", "Slot", "String", "Suspense", "Symbol", "Teleport", "Template", "Text",
    "Transition", "Window",
];

/// Derive a PascalCase component name from free text or a selector.
///
/// Non-alphanumerics separate words, each word's first letter is uppercased,
/// a leading digit gets a `Component` prefix and reserved identifiers get a
/// `Component` suffix.
pub fn derive_component_name(source: &str) -> String {
    let name: String = source
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect();

    if name.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let name = if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("Component{}", name)
    } else {
        name
    };

    if RESERVED.contains(&name.as_str()) {
        format!("{}Component", name)
    } else {
        name
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Use the caller's name if given, else derive one from the hint.
///
/// Both go through [`derive_component_name`], so the result is always a
/// bare identifier that is safe to use as a file name.
pub fn resolve_component_name(explicit: Option<&str>, hint: Option<&str>) -> String {
    match explicit.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => derive_component_name(name),
        None => derive_component_name(hint.unwrap_or_default()),
    }
}
