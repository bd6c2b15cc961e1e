use super::graph::GraphStore;
use super::identity::IdAllocator;
use crate::config::{BuilderConfig, GraphConfig};
use crate::document::{DocumentTree, ElementNode};
use crate::error::{GraphError, Result};
use crate::schema::Schema;
use crate::segmentation::{RuleBasedSegmenter, SentenceSegmenter};
use crate::types::*;
use tracing::{debug, info};

/// Walks a document tree depth-first and records typed nodes and
/// relationships in a `GraphStore`.
pub struct GraphBuilder {
    config: BuilderConfig,
    namespace: String,
    schema: Schema,
    segmenter: Box<dyn SentenceSegmenter>,
}

#[derive(Default)]
struct BuildStats {
    elements: usize,
    text_contents: usize,
    text_segments: usize,
    max_depth: usize,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(&GraphConfig::default())
    }
}

impl GraphBuilder {
    pub fn new(config: &GraphConfig) -> Self {
        Self::with_segmenter(config, Box::new(RuleBasedSegmenter::new(&config.segmentation)))
    }

    pub fn with_segmenter(config: &GraphConfig, segmenter: Box<dyn SentenceSegmenter>) -> Self {
        Self {
            config: config.builder.clone(),
            namespace: config.namespace.clone(),
            schema: Schema::load(),
            segmenter,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Build a fresh store (schema declarations included) from a tree.
    pub fn build(&self, tree: &DocumentTree, source_url: Option<&str>) -> Result<GraphStore> {
        let mut store = GraphStore::with_namespace(&self.namespace);
        self.build_into(&mut store, tree, source_url)?;
        Ok(store)
    }

    /// Populate a caller-owned store. Fails before touching the store when
    /// the tree is empty or nests deeper than `max_depth`.
    pub fn build_into(
        &self,
        store: &mut GraphStore,
        tree: &DocumentTree,
        source_url: Option<&str>,
    ) -> Result<BuildReport> {
        let roots = tree.roots();
        if roots.is_empty() {
            return Err(GraphError::EmptyInput);
        }
        for root in &roots {
            self.check_depth(root)?;
        }

        let statements_before = store.len();
        let mut ids = IdAllocator::new();
        let mut stats = BuildStats::default();

        self.schema.write_into(store);
        let page = self.add_page(store, &mut ids, tree, source_url);

        let mut root_ids = Vec::with_capacity(roots.len());
        for root in roots {
            root_ids.push(self.visit(store, &mut ids, &mut stats, root, None, 1));
        }

        let report = BuildReport {
            page,
            roots: root_ids,
            elements: stats.elements,
            text_contents: stats.text_contents,
            text_segments: stats.text_segments,
            max_depth: stats.max_depth,
            statements_added: store.len() - statements_before,
        };
        info!(
            elements = report.elements,
            text_segments = report.text_segments,
            max_depth = report.max_depth,
            statements_added = report.statements_added,
            "Built knowledge graph"
        );
        Ok(report)
    }

    /// Iterative depth scan so pathological nesting never reaches the
    /// recursive visitor.
    fn check_depth(&self, root: &ElementNode) -> Result<()> {
        let mut stack = vec![(root, 1usize)];
        while let Some((element, depth)) = stack.pop() {
            if depth > self.config.max_depth {
                return Err(GraphError::TraversalDepth {
                    depth,
                    max_depth: self.config.max_depth,
                });
            }
            stack.extend(element.element_children().map(|c| (c, depth + 1)));
        }
        Ok(())
    }

    fn add_page(
        &self,
        store: &mut GraphStore,
        ids: &mut IdAllocator,
        tree: &DocumentTree,
        source_url: Option<&str>,
    ) -> Iri {
        let page = ids.page();
        store.insert(Statement::new(page.clone(), Relation::Type, Category::Page.iri()));

        if let Some(url) = source_url {
            store.insert(Statement::literal(page.clone(), Relation::Url, Literal::string(url)));
            store.metadata_mut().source_url = Some(url.to_string());
        }
        if let Some(title) = tree.title() {
            store.insert(Statement::literal(page.clone(), Relation::Title, Literal::string(title)));
        }
        page
    }

    fn visit(
        &self,
        store: &mut GraphStore,
        ids: &mut IdAllocator,
        stats: &mut BuildStats,
        element: &ElementNode,
        parent: Option<&Iri>,
        depth: usize,
    ) -> Iri {
        stats.elements += 1;
        stats.max_depth = stats.max_depth.max(depth);

        let node = ids.element(&element.tag, element.attribute("id"));
        let category = Category::from_tag(&element.tag);
        store.insert(Statement::new(node.clone(), Relation::Type, category.iri()));
        store.insert(Statement::literal(
            node.clone(),
            Relation::HasTag,
            Literal::string(&element.tag),
        ));

        if let Some(text) = element.direct_text() {
            store.insert(Statement::literal(node.clone(), Relation::HasText, Literal::string(text)));
        }

        self.add_attributes(store, &node, element);

        if let Some(parent) = parent {
            store.link_parent_child(parent, &node);
        }

        if self.config.decompose_text {
            self.add_text_decomposition(store, ids, stats, &node, element);
        }

        let children: Vec<Iri> = element
            .element_children()
            .map(|child| self.visit(store, ids, stats, child, Some(&node), depth + 1))
            .collect();

        // One statement per unordered pair, in document order
        for (i, left) in children.iter().enumerate() {
            for right in &children[i + 1..] {
                store.insert(Statement::new(left.clone(), Relation::HasSibling, right.clone()));
            }
        }

        debug!(node = %node, tag = %element.tag, children = children.len(), "Visited element");
        node
    }

    fn add_attributes(&self, store: &mut GraphStore, node: &Iri, element: &ElementNode) {
        for attribute in &element.attributes {
            let value = attribute.value.as_str();
            match attribute.name.as_str() {
                "class" => {
                    for class in value.split_whitespace() {
                        store.insert(Statement::literal(
                            node.clone(),
                            Relation::HasClass,
                            Literal::string(class),
                        ));
                    }
                }
                "id" => {
                    store.insert(Statement::literal(node.clone(), Relation::HasId, Literal::string(value)));
                }
                "href" => {
                    store.insert(Statement::literal(
                        node.clone(),
                        Relation::HasHref,
                        Literal::string(value),
                    ));
                }
                "value" => {
                    store.insert(Statement::literal(
                        node.clone(),
                        Relation::HasValue,
                        Literal::string(value),
                    ));
                }
                name => {
                    store.insert(Statement::literal(
                        node.clone(),
                        Relation::HasAttribute,
                        Literal::string(format!("{name}:{value}")),
                    ));
                }
            }
        }
    }

    fn add_text_decomposition(
        &self,
        store: &mut GraphStore,
        ids: &mut IdAllocator,
        stats: &mut BuildStats,
        node: &Iri,
        element: &ElementNode,
    ) {
        let text = element.full_text();
        if text.is_empty() || text.chars().count() < self.config.min_text_chars {
            return;
        }

        let text_node = ids.text();
        stats.text_contents += 1;
        store.insert(Statement::new(text_node.clone(), Relation::Type, Category::TextContent.iri()));
        store.insert(Statement::literal(
            text_node.clone(),
            Relation::RawText,
            Literal::string(&text),
        ));
        store.insert(Statement::new(node.clone(), Relation::HasTextContent, text_node.clone()));

        for (position, sentence) in self.segmenter.segment(&text).into_iter().enumerate() {
            let segment = ids.sentence();
            stats.text_segments += 1;
            store.insert(Statement::new(segment.clone(), Relation::Type, Category::TextSegment.iri()));
            store.insert(Statement::literal(
                segment.clone(),
                Relation::TextPosition,
                Literal::Integer(position as i64),
            ));
            store.insert(Statement::literal(
                segment.clone(),
                Relation::Content,
                Literal::string(sentence),
            ));
            store.insert(Statement::new(text_node.clone(), Relation::HasSegment, segment));
        }
    }
}
