use crate::types::Iri;
use std::collections::HashSet;

/// Per-build identifier allocator.
///
/// Element identifiers follow `{tag}_{id}` when the element carries an `id`
/// attribute, otherwise `element_{n}_{tag}`. The element counter advances on
/// every element (with or without `id`) and starts at 2, so identical input
/// yields identical identifiers. Page, text and sentence nodes draw from
/// their own sequences.
#[derive(Debug)]
pub struct IdAllocator {
    element_counter: usize,
    page_counter: usize,
    text_counter: usize,
    sentence_counter: usize,
    issued: HashSet<Iri>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            element_counter: 1,
            page_counter: 0,
            text_counter: 0,
            sentence_counter: 0,
            issued: HashSet::new(),
        }
    }

    pub fn element(&mut self, tag: &str, id_attribute: Option<&str>) -> Iri {
        self.element_counter += 1;

        if let Some(id) = id_attribute.map(str::trim).filter(|id| !id.is_empty()) {
            let candidate = Iri::ex(&format!("{tag}_{}", sanitize_local(id)));
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
            // Duplicate id attribute: fall through to the counter form
        }

        loop {
            let fallback = Iri::ex(&format!("element_{}_{tag}", self.element_counter));
            if self.issued.insert(fallback.clone()) {
                return fallback;
            }
            self.element_counter += 1;
        }
    }

    pub fn page(&mut self) -> Iri {
        self.page_counter += 1;
        self.issue(format!("page_{}", self.page_counter))
    }

    pub fn text(&mut self) -> Iri {
        self.text_counter += 1;
        self.issue(format!("text_{}", self.text_counter))
    }

    pub fn sentence(&mut self) -> Iri {
        self.sentence_counter += 1;
        self.issue(format!("sentence_{}", self.sentence_counter))
    }

    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    fn issue(&mut self, local: String) -> Iri {
        let iri = Iri::ex(&local);
        self.issued.insert(iri.clone());
        iri
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep identifiers usable as IRI local names: anything outside
/// `[A-Za-z0-9_.-]` becomes `_`.
fn sanitize_local(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_advances_for_every_element() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.element("html", None).as_str(), "ex:element_2_html");
        assert_eq!(ids.element("div", Some("main")).as_str(), "ex:div_main");
        assert_eq!(ids.element("p", None).as_str(), "ex:element_4_p");
    }

    #[test]
    fn duplicate_id_attribute_falls_back_to_counter() {
        let mut ids = IdAllocator::new();
        let first = ids.element("div", Some("card"));
        let second = ids.element("div", Some("card"));
        assert_eq!(first.as_str(), "ex:div_card");
        assert_eq!(second.as_str(), "ex:element_3_div");
        assert_ne!(first, second);
    }

    #[test]
    fn id_values_are_sanitized() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.element("a", Some("buy now!")).as_str(), "ex:a_buy_now_");
    }

    #[test]
    fn auxiliary_sequences_are_independent() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.page().as_str(), "ex:page_1");
        assert_eq!(ids.text().as_str(), "ex:text_1");
        assert_eq!(ids.text().as_str(), "ex:text_2");
        assert_eq!(ids.sentence().as_str(), "ex:sentence_1");
        assert_eq!(ids.issued(), 4);
    }
}
