//! Print-safe style overrides, applied to the source element only while it is
//! being captured.
//!
//! `ExportStyleProfile` is an immutable value describing the overrides.
//! `StyleScope` applies it to an element and puts the element's original
//! attributes back when dropped, so every exit path (success, `?`, panic
//! unwinding) leaves the element as it was.

use std::collections::BTreeMap;

use tracing::debug;

use crate::export::source::SourceElement;
use crate::export::units::LogicalPixels;

/// Attribute that scopes the injected stylesheet to the element being captured.
pub const EXPORT_MARKER_ATTR: &str = "data-pdf-export";
const EXPORT_MARKER_VALUE: &str = "active";

pub const DEFAULT_FONT_STACK: &str =
    "Inter, \"Helvetica Neue\", Helvetica, Arial, sans-serif";

/// Overrides that force fixed-width, print-friendly rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportStyleProfile {
    pub width: LogicalPixels,
    pub font_stack: String,
}

impl ExportStyleProfile {
    pub fn print_safe(width: LogicalPixels) -> Self {
        Self {
            width,
            font_stack: DEFAULT_FONT_STACK.to_string(),
        }
    }

    /// CSS selector matching the marked element.
    pub fn selector(&self) -> String {
        format!("[{EXPORT_MARKER_ATTR}=\"{EXPORT_MARKER_VALUE}\"]")
    }

    /// Stylesheet scoped to the marked element and its descendants.
    pub fn stylesheet(&self) -> String {
        let selector = self.selector();
        let width = self.width.get();
        format!(
            "{selector} {{ \
                width: {width}px !important; \
                min-width: {width}px !important; \
                max-width: {width}px !important; \
                height: auto !important; \
                max-height: none !important; \
                margin: 0 !important; \
                overflow: visible !important; \
                background: #ffffff !important; \
                box-shadow: none !important; \
                transform: none !important; \
                font-family: {font} !important; \
                -webkit-print-color-adjust: exact; \
                print-color-adjust: exact; \
            }} \
            {selector} * {{ \
                box-shadow: none !important; \
                text-shadow: none !important; \
                transform: none !important; \
                animation: none !important; \
                transition: none !important; \
                overflow: visible !important; \
            }}",
            font = self.font_stack,
        )
    }

    /// Declarations appended to the element's inline `style`.
    fn inline_overrides(&self) -> String {
        format!(
            "width: {}px; overflow: visible; box-shadow: none; transform: none;",
            self.width.get()
        )
    }
}

/// Scoped application of an `ExportStyleProfile` to one element.
pub struct StyleScope<'a> {
    element: &'a mut SourceElement,
    saved: BTreeMap<String, String>,
    stylesheet: String,
    selector: String,
}

impl<'a> StyleScope<'a> {
    pub fn acquire(element: &'a mut SourceElement, profile: &ExportStyleProfile) -> Self {
        let saved = element.attributes.clone();

        element
            .attributes
            .insert(EXPORT_MARKER_ATTR.to_string(), EXPORT_MARKER_VALUE.to_string());

        let inline = match element.attributes.get("style").map(|s| s.trim()) {
            Some(existing) if !existing.is_empty() => {
                let sep = if existing.ends_with(';') { " " } else { "; " };
                format!("{existing}{sep}{}", profile.inline_overrides())
            }
            _ => profile.inline_overrides(),
        };
        element.attributes.insert("style".to_string(), inline);

        debug!("Export style overrides applied");
        Self {
            element,
            saved,
            stylesheet: profile.stylesheet(),
            selector: profile.selector(),
        }
    }

    pub fn element(&self) -> &SourceElement {
        self.element
    }

    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

impl Drop for StyleScope<'_> {
    fn drop(&mut self) {
        self.element.attributes = std::mem::take(&mut self.saved);
        debug!("Export style overrides reverted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element() -> SourceElement {
        SourceElement::new("<section>Experience</section>")
            .with_attribute("class", "preview shadow-lg")
            .with_attribute("style", "width: 100%; transform: scale(0.8)")
    }

    #[test]
    fn test_scope_marks_and_overrides_while_held() {
        let mut el = element();
        let profile = ExportStyleProfile::print_safe(LogicalPixels(794.0));
        let scope = StyleScope::acquire(&mut el, &profile);

        let held = scope.element();
        assert_eq!(held.attribute(EXPORT_MARKER_ATTR), Some("active"));
        let style = held.attribute("style").unwrap();
        assert!(style.starts_with("width: 100%; transform: scale(0.8); "));
        assert!(style.ends_with("width: 794px; overflow: visible; box-shadow: none; transform: none;"));
        assert!(scope.stylesheet().contains("[data-pdf-export=\"active\"] {"));
        assert!(scope.stylesheet().contains("width: 794px !important;"));
    }

    #[test]
    fn test_drop_restores_original_attributes_exactly() {
        let mut el = element();
        let before = el.clone();
        {
            let _scope = StyleScope::acquire(&mut el, &ExportStyleProfile::print_safe(LogicalPixels(794.0)));
        }
        assert_eq!(el, before);
    }

    #[test]
    fn test_restores_element_without_style_attribute() {
        let mut el = SourceElement::new("<p>x</p>");
        {
            let scope = StyleScope::acquire(&mut el, &ExportStyleProfile::print_safe(LogicalPixels(600.0)));
            assert_eq!(
                scope.element().attribute("style"),
                Some("width: 600px; overflow: visible; box-shadow: none; transform: none;")
            );
        }
        assert!(el.attributes.is_empty());
    }

    #[test]
    fn test_restores_when_capture_unwinds() {
        let mut el = element();
        let before = el.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = StyleScope::acquire(&mut el, &ExportStyleProfile::print_safe(LogicalPixels(794.0)));
            panic!("renderer crashed");
        }));
        assert!(result.is_err());
        assert_eq!(el, before);
    }
}
