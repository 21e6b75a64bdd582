use crate::model::{CategoryRegistry, Color4};

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub key: String,
    pub label: String,
    pub swatch: Color4,
}

/// Builds the legend from scratch, one entry per category in registry order.
pub fn render_legend(registry: &CategoryRegistry) -> Vec<LegendEntry> {
    registry
        .iter()
        .map(|(key, category)| LegendEntry {
            key: key.to_string(),
            label: capitalize(key),
            swatch: category.color,
        })
        .collect()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn legend_follows_registry_order() {
        let legend = render_legend(&CategoryRegistry::builtin());
        let labels: Vec<_> = legend.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Waypoints", "Ships", "Danger"]);
        assert_eq!(legend[2].swatch, Color4::rgb8(255, 0, 0));
    }

    #[test]
    fn legend_lists_each_key_once() {
        let mut registry = CategoryRegistry::builtin();
        let reef = Category {
            color: Color4::rgb8(0, 255, 255),
            size: 20.0,
        };
        registry.insert("reef", reef.clone()).unwrap();
        assert!(registry.insert("reef", reef).is_err());

        let legend = render_legend(&registry);
        assert_eq!(legend.len(), 4);
        let keys: Vec<_> = legend.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["waypoints", "ships", "danger", "reef"]);
    }

    #[test]
    fn capitalize_handles_edge_cases() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("x"), "X");
        assert_eq!(capitalize("élan"), "Élan");
        assert_eq!(capitalize("Reef"), "Reef");
    }

    #[test]
    fn empty_registry_renders_nothing() {
        assert!(render_legend(&CategoryRegistry::new()).is_empty());
    }
}
