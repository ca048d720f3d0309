pub mod config;
pub mod layout;
pub mod markup;
pub mod pager;
pub mod render;
pub mod scheduler;

pub use config::ViewConfig;
pub use layout::UnitLayout;
pub use markup::{write_html, write_html_to, write_plain, write_plain_to};
pub use pager::Pager;
pub use render::{render_unit, RenderedToken, RenderedUnit, TokenSlot};
pub use scheduler::Scheduler;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("estimated unit size must be a positive number, got {0}")]
    InvalidEstimate(f64),

    #[error("`{0}` must be at least 1")]
    ZeroSetting(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_index::build_index;
    use overlay_protocol::{AnnotationSpan, Code, CodeId, MarkFlags, SpanKey, Token};

    fn the_cat_sat() -> Vec<Token> {
        let words: Vec<String> = ["The", "cat", "sat"].iter().map(|s| s.to_string()).collect();
        overlay_tokens::build("The cat sat", &words, &[(0, 3), (4, 7), (8, 11)]).unwrap()
    }

    fn animal_span(key: u64, begin: u32, end: u32) -> AnnotationSpan {
        AnnotationSpan {
            key: SpanKey(key),
            id: None,
            begin_token: begin,
            end_token: end,
            code: Code { id: CodeId(1), name: "Animal".to_string(), color: "#ff0000".to_string() },
            groups: vec![],
        }
    }

    #[test]
    fn test_end_to_end_single_span() {
        let tokens = the_cat_sat();
        let (index, issues) = build_index(&[animal_span(1, 1, 2)], tokens.len());
        assert!(issues.is_empty());

        let unit = render_unit(0, 0..3, &tokens, &index);
        let marks: Vec<&[_]> = unit
            .slots
            .iter()
            .map(|slot| match slot {
                TokenSlot::Present(t) => t.marks.as_slice(),
                TokenSlot::Missing { .. } => panic!("no token is missing"),
            })
            .collect();

        assert!(marks[0].is_empty());
        assert_eq!(marks[1].len(), 1);
        assert!(marks[1][0].flags.contains(MarkFlags::ROUNDED_START | MarkFlags::ROUNDED_END));
        assert!(marks[2].is_empty());
        assert_eq!(write_plain(&unit), "The [cat]{Animal} sat");
    }

    #[test]
    fn test_missing_token_renders_placeholder() {
        let tokens = the_cat_sat();
        let (index, _) = build_index(&[animal_span(1, 0, 3)], tokens.len());

        let unit = render_unit(0, 1..5, &tokens, &index);

        assert_eq!(unit.slots.len(), 4);
        assert_eq!(unit.missing_count(), 2);
        assert_eq!(unit.slots[3], TokenSlot::Missing { index: 4 });

        let html = write_html(&unit);
        assert!(html.contains("class=\"tok tok-missing\" data-token-index=\"3\""));
        assert!(html.contains("data-token-index=\"2\""));
    }

    #[test]
    fn test_html_marks_and_escaping() {
        let words: Vec<String> = ["a", "<b>"].iter().map(|s| s.to_string()).collect();
        let tokens = overlay_tokens::build("a <b>", &words, &[(0, 1), (2, 5)]).unwrap();
        let (index, _) = build_index(&[animal_span(7, 1, 2)], tokens.len());

        let html = write_html(&render_unit(2, 0..2, &tokens, &index));

        assert!(html.starts_with("<div class=\"unit\" data-unit-index=\"2\">"));
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("class=\"mark rounded-start rounded-end\" data-span-key=\"7\""));
        assert!(html.contains("height:100%"));
        assert!(html.contains("<span class=\"tag\" data-span-key=\"7\" style=\"color:#ff0000\">Animal</span>"));
        // Whitespace between tokens survives.
        assert!(html.contains("a</span> <span"));
    }

    #[test]
    fn test_code_label_and_color_are_escaped() {
        let tokens = the_cat_sat();
        let mut span = animal_span(3, 1, 2);
        span.code.name = "\"Q\" & <A>".to_string();
        span.code.color = "red\" onclick=\"x".to_string();
        let (index, _) = build_index(&[span], tokens.len());

        let mut html = String::from("<section>");
        write_html_to(&mut html, &render_unit(0, 0..3, &tokens, &index)).unwrap();

        assert!(html.starts_with("<section><div class=\"unit\""));
        assert!(html.contains(">&quot;Q&quot; &amp; &lt;A&gt;</span>"));
        assert!(html.contains("background-color:red&quot; onclick=&quot;x\""));
        assert!(!html.contains("onclick=\"x"));
    }

    #[test]
    fn test_newline_tokens_become_breaks() {
        let words: Vec<String> = ["one", "\n\n", "two"].iter().map(|s| s.to_string()).collect();
        let tokens = overlay_tokens::build("one\n\ntwo", &words, &[(0, 3), (3, 5), (5, 8)]).unwrap();
        let (index, _) = build_index(std::iter::empty::<&AnnotationSpan>(), tokens.len());

        let html = write_html(&render_unit(0, 0..3, &tokens, &index));
        assert!(html.contains("data-token-index=\"1\"><br/><br/></span>"));
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config: ViewConfig = serde_json::from_str(r#"{"overscan": 3}"#).unwrap();
        assert_eq!(config.overscan, 3);
        assert_eq!(config.elements_per_page, ViewConfig::default().elements_per_page);
        assert!(config.validate().is_ok());

        let zero = ViewConfig { tokens_per_unit: 0, ..ViewConfig::default() };
        assert_eq!(zero.validate(), Err(ViewError::ZeroSetting("tokens_per_unit")));
        let negative = ViewConfig { estimated_unit_size: -1.0, ..ViewConfig::default() };
        assert!(negative.validate().is_err());
    }
}
