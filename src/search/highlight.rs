use crate::backend::TextFragment;

/// A located search match in top-left, screen-oriented page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Resolves `query` against one page's ordered fragment sequence.
///
/// The scan is a case-insensitive substring match that may span fragment
/// boundaries: fragment text is appended to a running lower-cased window,
/// and as soon as the window contains the query one box is emitted and the
/// window resets, so matches never overlap. A partial match still open when
/// the sequence ends is dropped. `page_height` is the rendered page's pixel
/// height, used to flip the fragments' bottom-left origins into top-left
/// screen space.
pub fn resolve_highlights(
    fragments: &[TextFragment],
    query: &str,
    page_height: f32,
) -> Vec<HighlightBox> {
    let query = query.to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut boxes = Vec::new();
    let mut window = String::new();
    // Byte offset within `window` at which each buffered fragment begins.
    let mut spans: Vec<(usize, usize)> = Vec::new();

    for (index, fragment) in fragments.iter().enumerate() {
        spans.push((window.len(), index));
        window.push_str(&fragment.text.to_lowercase());

        if let Some(offset) = window.find(&query) {
            let start_index = spans
                .iter()
                .rev()
                .find(|(start, _)| *start <= offset)
                .map(|(_, fragment_index)| *fragment_index)
                .unwrap_or(index);
            let start = &fragments[start_index];

            boxes.push(HighlightBox {
                left: start.origin_x,
                top: page_height - start.origin_y - start.height,
                width: fragment.width,
                height: start.height,
            });

            window.clear();
            spans.clear();
        }
    }

    boxes
}

#[cfg(test)]
mod tests {
    use crate::backend::TextFragment;

    use super::resolve_highlights;

    fn fragment(text: &str, x: f32, y: f32, width: f32, height: f32) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            origin_x: x,
            origin_y: y,
            width,
            height,
            font_name: "Test".to_string(),
            is_line_end: false,
        }
    }

    #[test]
    fn matches_across_fragment_boundaries_case_insensitively() {
        let fragments = vec![
            fragment("Hello ", 10.0, 40.0, 30.0, 12.0),
            fragment("World", 40.0, 40.0, 28.0, 12.0),
        ];

        let boxes = resolve_highlights(&fragments, "hello world", 100.0);

        assert_eq!(boxes.len(), 1);
        let hit = &boxes[0];
        assert_eq!(hit.left, 10.0);
        assert_eq!(hit.top, 100.0 - 40.0 - 12.0);
        assert_eq!(hit.width, 28.0);
        assert_eq!(hit.height, 12.0);
    }

    #[test]
    fn match_inside_one_fragment_uses_that_fragment_for_both_edges() {
        let fragments = vec![
            fragment("intro ", 5.0, 80.0, 20.0, 10.0),
            fragment("needle here", 30.0, 80.0, 44.0, 10.0),
        ];

        let boxes = resolve_highlights(&fragments, "needle", 100.0);

        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].left, 30.0);
        assert_eq!(boxes[0].width, 44.0);
    }

    #[test]
    fn empty_query_yields_no_boxes() {
        let fragments = vec![fragment("anything", 0.0, 0.0, 10.0, 10.0)];
        assert!(resolve_highlights(&fragments, "", 100.0).is_empty());
    }

    #[test]
    fn absent_query_yields_no_boxes() {
        let fragments = vec![
            fragment("alpha ", 0.0, 0.0, 10.0, 10.0),
            fragment("beta", 10.0, 0.0, 10.0, 10.0),
        ];
        assert!(resolve_highlights(&fragments, "zzz", 100.0).is_empty());
    }

    #[test]
    fn matches_do_not_overlap() {
        let fragments = vec![
            fragment("a", 0.0, 0.0, 5.0, 10.0),
            fragment("a", 5.0, 0.0, 5.0, 10.0),
            fragment("a", 10.0, 0.0, 5.0, 10.0),
        ];

        // "aa" over "aaa" completes once; the trailing "a" stays a partial
        // match and is dropped.
        let boxes = resolve_highlights(&fragments, "aa", 100.0);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].left, 0.0);
    }

    #[test]
    fn repeated_query_matches_per_occurrence_without_overlap() {
        let fragments = vec![
            fragment("ab", 0.0, 0.0, 8.0, 10.0),
            fragment("ab", 8.0, 0.0, 8.0, 10.0),
        ];

        let boxes = resolve_highlights(&fragments, "ab", 100.0);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].left, 0.0);
        assert_eq!(boxes[1].left, 8.0);
    }

    #[test]
    fn trailing_partial_match_is_dropped_silently() {
        let fragments = vec![
            fragment("the nee", 0.0, 0.0, 20.0, 10.0),
        ];
        assert!(resolve_highlights(&fragments, "needle", 100.0).is_empty());
    }

    #[test]
    fn empty_fragment_sequence_yields_no_boxes() {
        assert!(resolve_highlights(&[], "query", 100.0).is_empty());
    }
}
