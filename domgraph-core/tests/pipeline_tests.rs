//! Pipeline tests — markup in, graph out, then inference and search.
//!
//! Fixtures live in `test_fixtures/` as plain HTML. Each module checks one
//! boundary of the pipeline:
//!
//! - Construction: structural invariants of a freshly built store
//! - Inference: closure strategies over built stores
//! - Query/search: pattern queries and similarity ranking
//! - Export: serialized output and reruns

use domgraph_core::config::TransitiveMode;
use domgraph_core::rules::{InferenceRule, TransitiveContainsRule};
use domgraph_core::*;
use std::path::PathBuf;

// ============================================================================
// Fixture helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures")
}

fn load_markup(fixture_name: &str) -> String {
    let path = fixtures_dir().join(fixture_name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Missing fixture: {}", path.display()))
}

fn parse_fixture(fixture_name: &str) -> DocumentTree {
    HtmlPreprocessor::default()
        .parse_markup(&load_markup(fixture_name))
        .expect("fixture should parse")
}

/// Store built from a fixture, no inference
fn build_fixture(fixture_name: &str) -> GraphStore {
    GraphBuilder::default()
        .build(&parse_fixture(fixture_name), Some("https://shop.example/trail-runner"))
        .expect("fixture should build")
}

/// Store after the default reasoning pipeline
fn process_fixture(fixture_name: &str) -> GraphStore {
    PageProcessor::default()
        .process_markup(&load_markup(fixture_name), Some("https://shop.example/trail-runner"))
        .expect("fixture should process")
        .store
}

fn subjects_with(store: &GraphStore, relation: Relation, value: &str) -> Vec<Iri> {
    store
        .matching(None, Some(relation), Some(&Term::Literal(Literal::string(value))))
        .map(|st| st.subject.clone())
        .collect()
}

fn single_subject(store: &GraphStore, relation: Relation, value: &str) -> Iri {
    let subjects = subjects_with(store, relation, value);
    assert_eq!(subjects.len(), 1, "expected one subject with {relation} {value:?}");
    subjects[0].clone()
}

// ============================================================================
// Construction
// ============================================================================

mod construction {
    use super::*;

    #[test]
    fn parent_child_statements_come_in_complete_sets() {
        let store = build_fixture("product_page.html");
        let edges: Vec<_> = store.with_relation(Relation::HasChild).cloned().collect();
        assert!(!edges.is_empty());

        for edge in edges {
            let child = edge.object.as_resource().expect("child is a resource").clone();
            let parent = edge.subject.clone();
            assert!(store.has(&child, Relation::IsChildOf, parent.clone()), "missing isChildOf for {edge}");
            assert!(store.has(&parent, Relation::Contains, child.clone()), "missing contains for {edge}");
            assert!(store.has(&child, Relation::IsContainedIn, parent.clone()), "missing isContainedIn for {edge}");
        }
    }

    #[test]
    fn siblings_are_recorded_once_per_unordered_pair() {
        let store = build_fixture("product_page.html");

        for st in store.with_relation(Relation::HasSibling) {
            let other = st.object.as_resource().unwrap();
            assert_ne!(&st.subject, other, "self sibling: {st}");
            assert!(
                !store.has(other, Relation::HasSibling, st.subject.clone()),
                "reverse sibling materialized before inference: {st}"
            );
        }

        // nav has three links: 3 * 2 / 2 pairs
        let nav = single_subject(&store, Relation::HasClass, "menu");
        let links: Vec<Iri> = store
            .objects(&nav, Relation::HasChild)
            .filter_map(|t| t.as_resource().cloned())
            .collect();
        assert_eq!(links.len(), 3);
        let pairs = store
            .with_relation(Relation::HasSibling)
            .filter(|st| links.contains(&st.subject))
            .count();
        assert_eq!(pairs, 3);
    }

    #[test]
    fn every_element_is_typed_by_its_tag() {
        let store = build_fixture("product_page.html");
        let tagged: Vec<_> = store.with_relation(Relation::HasTag).cloned().collect();
        for st in tagged {
            let tag = st.object.lexical();
            assert!(
                store.has(&st.subject, Relation::Type, Category::from_tag(&tag).iri()),
                "{} ({tag}) not typed as {}",
                st.subject,
                Category::from_tag(&tag).name()
            );
        }

        let button = single_subject(&store, Relation::HasText, "Add to cart");
        assert!(store.has(&button, Relation::Type, Category::LinkElement.iri()));
        let input = single_subject(&store, Relation::HasValue, "1");
        assert!(store.has(&input, Relation::Type, Category::FormElement.iri()));
    }

    #[test]
    fn scripts_and_styles_never_reach_the_graph() {
        let store = build_fixture("product_page.html");
        assert!(subjects_with(&store, Relation::HasTag, "script").is_empty());
        assert!(subjects_with(&store, Relation::HasTag, "style").is_empty());
        assert!(!store
            .iter()
            .any(|st| st.object.lexical().contains("track(") || st.object.lexical().contains("font-family")));
    }

    #[test]
    fn id_attribute_names_the_node() {
        let store = build_fixture("product_page.html");
        let main = Iri::ex("main_content");
        assert!(store.has(&main, Relation::HasId, Literal::string("content")));
        assert!(store.has(&main, Relation::Type, Category::StructuralElement.iri()));
    }

    #[test]
    fn page_node_carries_url_and_title() {
        let store = build_fixture("product_page.html");
        let page = Iri::ex("page_1");
        assert!(store.has(&page, Relation::Type, Category::Page.iri()));
        assert!(store.has(&page, Relation::Title, Literal::string("Trail Runner 2 | Example Outfitters")));
        assert!(store.has(
            &page,
            Relation::Url,
            Literal::string("https://shop.example/trail-runner")
        ));
    }

    #[test]
    fn description_splits_into_ordered_sentences() {
        let store = build_fixture("product_page.html");
        let description = single_subject(&store, Relation::HasClass, "description");
        let text_node = store
            .objects(&description, Relation::HasTextContent)
            .find_map(|t| t.as_resource().cloned())
            .expect("description has text content");

        let mut segments: Vec<(i64, String)> = store
            .objects(&text_node, Relation::HasSegment)
            .filter_map(|t| t.as_resource().cloned())
            .map(|segment| {
                let position = store
                    .objects(&segment, Relation::TextPosition)
                    .find_map(|t| match t {
                        Term::Literal(Literal::Integer(i)) => Some(*i),
                        _ => None,
                    })
                    .unwrap();
                let content = store
                    .objects(&segment, Relation::Content)
                    .next()
                    .unwrap()
                    .lexical();
                (position, content)
            })
            .collect();
        segments.sort();

        assert_eq!(
            segments,
            vec![
                (0, "Lightweight trail shoe with a grippy sole.".to_string()),
                (1, "Dr. Smith tested it on 40 km of mud.".to_string()),
                (2, "It held up well!".to_string()),
            ]
        );
    }

    #[test]
    fn markup_without_elements_is_empty_input() {
        let err = PageProcessor::default()
            .process_markup("<!-- nothing here -->", None)
            .unwrap_err();
        assert!(matches!(err, GraphError::EmptyInput));
    }
}

// ============================================================================
// Inference
// ============================================================================

mod inference {
    use super::*;

    fn contains_count(store: &GraphStore) -> usize {
        store.with_relation(Relation::Contains).count()
    }

    #[test]
    fn shared_class_yields_pairwise_similarity() {
        let mut store = build_fixture("shared_classes.html");
        InferenceEngine::default()
            .infer(&mut store, ReasoningStrategy::ClassSimilarity)
            .unwrap();

        let titles = subjects_with(&store, Relation::HasClass, "card-title");
        assert_eq!(titles.len(), 3);
        assert_eq!(store.with_relation(Relation::HasSimilarPurposeTo).count(), 6);
        for a in &titles {
            for b in &titles {
                assert_eq!(a != b, store.has(a, Relation::HasSimilarPurposeTo, b.clone()));
            }
        }
    }

    #[test]
    fn fixpoint_closes_a_four_node_chain() {
        let mut store = build_fixture("nested_chain.html");
        assert_eq!(contains_count(&store), 3);

        TransitiveContainsRule::new(TransitiveMode::Fixpoint, 64)
            .apply(&mut store)
            .unwrap();
        assert_eq!(contains_count(&store), 6);
        assert!(store.has(&Iri::ex("div_a"), Relation::Contains, Iri::ex("div_d")));
    }

    #[test]
    fn single_pass_leaves_the_longest_edge_out() {
        let mut store = build_fixture("nested_chain.html");
        TransitiveContainsRule::new(TransitiveMode::SinglePass, 64)
            .apply(&mut store)
            .unwrap();

        assert_eq!(contains_count(&store), 5);
        assert!(store.has(&Iri::ex("div_a"), Relation::Contains, Iri::ex("div_c")));
        assert!(store.has(&Iri::ex("div_b"), Relation::Contains, Iri::ex("div_d")));
        assert!(!store.has(&Iri::ex("div_a"), Relation::Contains, Iri::ex("div_d")));
    }

    #[test]
    fn iteration_bound_reports_reasoning_error_and_keeps_progress() {
        let mut store = build_fixture("nested_chain.html");
        let mut config = GraphConfig::default().reasoning;
        config.max_iterations = 1;

        let err = InferenceEngine::new(&config)
            .infer(&mut store, ReasoningStrategy::TransitiveContains)
            .unwrap_err();
        assert!(matches!(err, GraphError::Reasoning { ref strategy, .. } if strategy == "TransitiveContains"));
        assert_eq!(contains_count(&store), 5);
    }

    #[test]
    fn owl_rl_materializes_symmetric_siblings() {
        let mut store = build_fixture("product_page.html");
        InferenceEngine::default()
            .infer(&mut store, ReasoningStrategy::OwlRl)
            .unwrap();

        for st in store.with_relation(Relation::HasSibling) {
            let other = st.object.as_resource().unwrap();
            assert!(store.has(other, Relation::HasSibling, st.subject.clone()), "no reverse for {st}");
        }
        let nav = single_subject(&store, Relation::HasClass, "menu");
        let main = Iri::ex("main_content");
        // hasChild is declared transitive, and its inverse follows
        let h1 = single_subject(&store, Relation::HasClass, "product-title");
        let html = Iri::ex("element_2_html");
        assert!(store.has(&html, Relation::HasChild, h1.clone()));
        assert!(store.has(&h1, Relation::IsChildOf, html));
        assert!(store.has(&main, Relation::HasChild, h1));
        assert!(!store.has(&nav, Relation::HasChild, main));
    }

    #[test]
    fn rdfs_types_subcategories_as_elements() {
        let mut store = build_fixture("product_page.html");
        let h1 = single_subject(&store, Relation::HasClass, "product-title");
        assert!(!store.has(&h1, Relation::Type, Category::Element.iri()));

        InferenceEngine::default()
            .infer(&mut store, ReasoningStrategy::Rdfs)
            .unwrap();
        assert!(store.has(&h1, Relation::Type, Category::TextElement.iri()));
        assert!(store.has(&h1, Relation::Type, Category::Element.iri()));
    }

    #[test]
    fn inference_is_idempotent() {
        let mut store = build_fixture("product_page.html");
        let engine = InferenceEngine::default();
        engine.apply_pipeline(&mut store).unwrap();
        let settled = store.len();
        assert_eq!(engine.apply_pipeline(&mut store).unwrap(), 0);
        assert_eq!(store.len(), settled);
    }
}

// ============================================================================
// Query and search
// ============================================================================

mod query_and_search {
    use super::*;
    use domgraph_core::query;

    #[test]
    fn price_query_returns_the_price_paragraph() {
        let store = process_fixture("product_page.html");
        let results = query::query(
            &store,
            r#"PREFIX ex: <http://example.org/>
               SELECT ?element ?text
               WHERE {
                 ?element a ?type .
                 ?element ex:hasText ?text .
                 FILTER(CONTAINS(LCASE(?text), "price"))
               }"#,
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        let row = &results.rows[0];
        assert_eq!(row["text"], Term::Literal(Literal::string("Price: $89.99")));
        let element = row["element"].as_resource().unwrap();
        assert!(store.has(element, Relation::HasClass, Literal::string("price")));
    }

    #[test]
    fn query_over_inferred_similarity() {
        let store = process_fixture("product_page.html");
        let results = query::query(
            &store,
            r#"SELECT DISTINCT ?other WHERE {
                 ?link ex:hasText "Home" .
                 ?link ex:hasSimilarPurposeTo ?other .
                 ?other ex:hasHref ?href .
                 FILTER(STRSTARTS(?href, "/s"))
               }"#,
        )
        .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn malformed_query_is_an_error_and_no_match_is_not() {
        let store = process_fixture("product_page.html");
        assert!(matches!(
            query::query(&store, "SELECT ?x WHERE { ?x ex:hasText }"),
            Err(GraphError::MalformedQuery { .. })
        ));
        let empty = query::query(&store, r#"SELECT ?x WHERE { ?x ex:hasText "no such text" }"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn similarity_search_ranks_price_text_first() {
        let store = process_fixture("product_page.html");
        let embedder = HashingEmbedder::default();
        let search = QueryBasedSearch::new(&store, &embedder, &GraphConfig::default().search);

        let hits = search.search("price", Some(0.0)).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].text, "Price: $89.99");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn raising_the_threshold_never_adds_hits() {
        let store = process_fixture("product_page.html");
        let embedder = HashingEmbedder::default();

        let all = query::search(&store, &embedder, "trail shoe", 0.0).unwrap();
        let lowest = all.last().map(|h| h.score).unwrap_or(0.0);
        let fewer = query::search(&store, &embedder, "trail shoe", lowest + 1e-4).unwrap();
        assert!(fewer.len() < all.len());
        let none = query::search(&store, &embedder, "trail shoe", 1.5).unwrap();
        assert!(none.is_empty());
    }
}

// ============================================================================
// Export and reruns
// ============================================================================

mod export {
    use super::*;

    #[test]
    fn rebuilding_the_same_markup_is_deterministic() {
        let first = build_fixture("product_page.html");
        let second = build_fixture("product_page.html");
        assert_eq!(first.len(), second.len());
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_ne!(first.metadata().build_id, second.metadata().build_id);
    }

    #[test]
    fn building_into_the_same_store_twice_adds_nothing() {
        let tree = parse_fixture("product_page.html");
        let builder = GraphBuilder::default();
        let mut store = GraphStore::new();

        let first = builder.build_into(&mut store, &tree, None).unwrap();
        let second = builder.build_into(&mut store, &tree, None).unwrap();
        assert!(first.statements_added > 0);
        assert_eq!(second.statements_added, 0);
    }

    #[test]
    fn json_export_carries_schema_version_and_statements() {
        let store = process_fixture("product_page.html");
        let path = std::env::temp_dir().join(format!("domgraph-{}.json", uuid::Uuid::new_v4()));
        let path_str = path.to_str().unwrap();

        store.save_with_format(path_str, "json").unwrap();
        let saved: SerializedGraph =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(saved.schema_version, SCHEMA_VERSION);
        assert_eq!(saved.statement_count, store.len());
        assert_eq!(saved.fingerprint, store.fingerprint());
        assert!(saved.metadata.markup_hash.is_some());
    }

    #[test]
    fn ntriples_export_writes_one_line_per_statement() {
        let store = build_fixture("nested_chain.html");
        let text = store.to_ntriples("https://shop.example/graph#");
        assert_eq!(text.lines().count(), store.len());
        assert!(text.contains(
            "<https://shop.example/graph#div_a> <https://shop.example/graph#contains> <https://shop.example/graph#div_b> ."
        ));
    }

    #[test]
    fn centrality_scores_attach_to_every_node() {
        let mut store = build_fixture("nested_chain.html");
        let scores = GraphAnalytics::compute_centrality(&mut store);
        assert!(!scores.is_empty());
        let total_rank: f64 = scores.iter().map(|s| s.pagerank).sum();
        assert!((total_rank - 1.0).abs() < 1e-3);
        for score in &scores {
            assert_eq!(store.objects(&score.node, Relation::HasPageRank).count(), 1);
        }
    }
}
