use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use engine_logging::{engine_debug, engine_trace};
use regex::Regex;

use crate::dom::{DocumentTree, HtmlDocument};
use crate::types::{CitationRecord, NO_TEXT_LABEL};

/// Elements that may carry a footnote-style marker such as `[3]`.
const MARKER_HOSTS: &[&str] = &["sup", "span"];

// Anchored at the start only: `12abc` still yields marker `12`.
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[?(\d{1,2})\]?").expect("marker pattern"));
static CONFIDENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2,3})\s*%").expect("confidence pattern"));

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> Vec<CitationRecord>;
}

/// Two-pass citation extractor:
/// - marker pass: `sup`/`span` elements holding a `[n]` marker are tied to the
///   first `a[href]` inside their parent element
/// - link pass: every remaining `http(s)` anchor, with the percentage that
///   directly follows it taken as a confidence score.
///
/// Records are unique by raw href; marker-pass records come first.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerLinkExtractor;

impl MarkerLinkExtractor {
    pub fn extract_tree<T: DocumentTree>(&self, tree: &T) -> Vec<CitationRecord> {
        let mut citations = CitationList::default();
        let references = marker_pass(tree, &mut citations);
        let after_markers = citations.records.len();
        link_pass(tree, &references, &mut citations);
        engine_debug!(
            "Extracted {} citations ({} from markers, {} from links, {} marker references)",
            citations.records.len(),
            after_markers,
            citations.records.len() - after_markers,
            references.len()
        );
        citations.records
    }
}

impl Extractor for MarkerLinkExtractor {
    fn extract(&self, html: &str) -> Vec<CitationRecord> {
        let document = HtmlDocument::parse(html);
        self.extract_tree(&document)
    }
}

/// Href to marker id, built by the marker pass and only read afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferenceMap {
    ids: HashMap<String, String>,
}

impl ReferenceMap {
    pub fn get(&self, href: &str) -> Option<&str> {
        self.ids.get(href).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn record(&mut self, href: &str, marker_id: &str) {
        self.ids
            .entry(href.to_string())
            .or_insert_with(|| marker_id.to_string());
    }
}

#[derive(Default)]
struct CitationList {
    records: Vec<CitationRecord>,
    seen: HashSet<String>,
}

impl CitationList {
    fn push_if_new(&mut self, record: CitationRecord) {
        if self.seen.insert(record.url.clone()) {
            self.records.push(record);
        }
    }

    fn contains(&self, href: &str) -> bool {
        self.seen.contains(href)
    }
}

fn marker_pass<T: DocumentTree>(tree: &T, citations: &mut CitationList) -> ReferenceMap {
    let mut references = ReferenceMap::default();
    // Markers in one container all resolve to the same anchor.
    let mut anchors: HashMap<T::Node, Option<T::Node>> = HashMap::new();

    for node in tree.elements() {
        if !tree
            .tag_name(node)
            .is_some_and(|tag| MARKER_HOSTS.iter().any(|h| tag.eq_ignore_ascii_case(h)))
        {
            continue;
        }
        let Some(marker_id) = parse_marker(&tree.stripped_text(node)) else {
            continue;
        };
        let Some(parent) = tree.parent_element(node) else {
            continue;
        };
        let anchor = *anchors
            .entry(parent)
            .or_insert_with(|| first_linked_anchor(tree, parent));
        let Some(anchor) = anchor else {
            engine_trace!("Marker [{}] has no nearby link", marker_id);
            continue;
        };
        let Some(href) = tree.attr(anchor, "href") else {
            continue;
        };

        references.record(href, &marker_id);
        if !citations.contains(href) {
            citations.push_if_new(CitationRecord {
                text: link_text(tree, anchor),
                url: href.to_string(),
                domain: domain_of(href),
                reference_id: marker_id,
                confidence: String::new(),
            });
        }
    }

    references
}

fn link_pass<T: DocumentTree>(tree: &T, references: &ReferenceMap, citations: &mut CitationList) {
    for node in tree.elements() {
        if !tree
            .tag_name(node)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("a"))
        {
            continue;
        }
        let Some(href) = tree.attr(node, "href") else {
            continue;
        };
        if !is_web_link(href) || citations.contains(href) {
            continue;
        }

        let confidence = tree
            .next_text(node)
            .and_then(|text| parse_confidence(&text))
            .unwrap_or_default();
        citations.push_if_new(CitationRecord {
            text: link_text(tree, node),
            url: href.to_string(),
            domain: domain_of(href),
            reference_id: references.get(href).unwrap_or_default().to_string(),
            confidence,
        });
    }
}

fn first_linked_anchor<T: DocumentTree>(tree: &T, container: T::Node) -> Option<T::Node> {
    tree.descendant_elements(container).find(|&el| {
        tree.tag_name(el)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("a"))
            && tree.attr(el, "href").is_some()
    })
}

fn link_text<T: DocumentTree>(tree: &T, anchor: T::Node) -> String {
    let text = tree.stripped_text(anchor);
    if text.is_empty() {
        NO_TEXT_LABEL.to_string()
    } else {
        text
    }
}

/// Marker id from an element's stripped text, e.g. `[7]` -> `7`.
pub fn parse_marker(text: &str) -> Option<String> {
    MARKER_RE
        .captures(text.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First `NN%` or `NNN%` in `text`, normalized to drop inner whitespace.
pub fn parse_confidence(text: &str) -> Option<String> {
    CONFIDENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| format!("{}%", m.as_str()))
}

/// Host of `href` without a leading `www.`; empty when the href has no host.
///
/// The host is read from the authority text as written, so protocol-relative
/// links, internationalized names and hosts a strict URL parser would reject
/// still produce a readable domain.
pub fn domain_of(href: &str) -> String {
    let Some(rest) = after_scheme(href.trim()) else {
        return String::new();
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    let host = strip_port(host_port).to_lowercase();
    match host.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => host,
    }
}

/// Text following `scheme://` or a leading `//`.
fn after_scheme(href: &str) -> Option<&str> {
    if let Some(rest) = href.strip_prefix("//") {
        return Some(rest);
    }
    let (scheme, rest) = href.split_once("://")?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(rest)
}

fn strip_port(host_port: &str) -> &str {
    if host_port.starts_with('[') {
        return host_port
            .find(']')
            .map_or(host_port, |end| &host_port[..=end]);
    }
    host_port
        .split_once(':')
        .map_or(host_port, |(host, _)| host)
}

pub fn is_web_link(href: &str) -> bool {
    let lower = href
        .get(..8)
        .unwrap_or(href)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::{domain_of, is_web_link, parse_confidence, parse_marker, MarkerLinkExtractor};
    use std::cell::Cell;

    use crate::dom::DocumentTree;
    use crate::types::CitationRecord;

    /// Hand-built tree so the passes can be exercised without the HTML parser.
    #[derive(Default)]
    struct FakeTree {
        nodes: Vec<FakeNode>,
        descendant_visits: Cell<usize>,
    }

    struct FakeNode {
        tag: Option<&'static str>,
        attrs: Vec<(&'static str, &'static str)>,
        text: &'static str,
        parent: Option<usize>,
        children: Vec<usize>,
    }

    impl FakeTree {
        fn root() -> (Self, usize) {
            let mut tree = FakeTree::default();
            let id = tree.push(None, Some("body"), Vec::new(), "");
            (tree, id)
        }

        fn element(
            &mut self,
            parent: usize,
            tag: &'static str,
            attrs: Vec<(&'static str, &'static str)>,
        ) -> usize {
            self.push(Some(parent), Some(tag), attrs, "")
        }

        fn text(&mut self, parent: usize, text: &'static str) {
            self.push(Some(parent), None, Vec::new(), text);
        }

        fn push(
            &mut self,
            parent: Option<usize>,
            tag: Option<&'static str>,
            attrs: Vec<(&'static str, &'static str)>,
            text: &'static str,
        ) -> usize {
            let id = self.nodes.len();
            self.nodes.push(FakeNode {
                tag,
                attrs,
                text,
                parent,
                children: Vec::new(),
            });
            if let Some(p) = parent {
                self.nodes[p].children.push(id);
            }
            id
        }

        fn preorder(&self, from: usize, out: &mut Vec<usize>) {
            out.push(from);
            for &child in &self.nodes[from].children {
                self.preorder(child, out);
            }
        }

        fn document_order(&self) -> Vec<usize> {
            let mut out = Vec::new();
            if !self.nodes.is_empty() {
                self.preorder(0, &mut out);
            }
            out
        }
    }

    impl DocumentTree for FakeTree {
        type Node = usize;

        fn elements(&self) -> Vec<usize> {
            self.document_order()
                .into_iter()
                .filter(|&id| self.nodes[id].tag.is_some())
                .collect()
        }

        fn tag_name(&self, node: usize) -> Option<&str> {
            self.nodes[node].tag
        }

        fn attr(&self, node: usize, name: &str) -> Option<&str> {
            self.nodes[node]
                .attrs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
        }

        fn stripped_text(&self, node: usize) -> String {
            let mut order = Vec::new();
            self.preorder(node, &mut order);
            order
                .into_iter()
                .filter(|&id| self.nodes[id].tag.is_none())
                .map(|id| self.nodes[id].text.trim())
                .collect()
        }

        fn parent_element(&self, node: usize) -> Option<usize> {
            self.nodes[node].parent
        }

        fn descendant_elements(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
            let mut order = Vec::new();
            self.preorder(node, &mut order);
            order
                .into_iter()
                .skip(1)
                .filter(move |&id| self.nodes[id].tag.is_some())
                .inspect(move |_| self.descendant_visits.set(self.descendant_visits.get() + 1))
        }

        fn next_text(&self, node: usize) -> Option<String> {
            let mut subtree = Vec::new();
            self.preorder(node, &mut subtree);
            let last = *subtree.last()?;
            let order = self.document_order();
            let pos = order.iter().position(|&id| id == last)?;
            order[pos + 1..]
                .iter()
                .find(|&&id| self.nodes[id].tag.is_none() && !self.nodes[id].text.trim().is_empty())
                .map(|&id| self.nodes[id].text.to_string())
        }
    }

    fn record(text: &str, url: &str, domain: &str, id: &str, confidence: &str) -> CitationRecord {
        CitationRecord {
            text: text.to_string(),
            url: url.to_string(),
            domain: domain.to_string(),
            reference_id: id.to_string(),
            confidence: confidence.to_string(),
        }
    }

    #[test]
    fn marker_inside_list_item_links_to_sibling_anchor() {
        let (mut tree, body) = FakeTree::root();
        let li = tree.element(body, "li", Vec::new());
        let a = tree.element(li, "a", vec![("href", "https://example.com/p")]);
        tree.text(a, "Example");
        let sup = tree.element(li, "sup", Vec::new());
        tree.text(sup, "[1]");

        let records = MarkerLinkExtractor.extract_tree(&tree);
        assert_eq!(
            records,
            vec![record("Example", "https://example.com/p", "example.com", "1", "")]
        );
    }

    #[test]
    fn constructed_tree_reads_confidence_after_link() {
        let (mut tree, body) = FakeTree::root();
        let a = tree.element(body, "a", vec![("href", "https://foo.com/x")]);
        tree.text(a, "Foo");
        tree.text(body, "93%");

        let records = MarkerLinkExtractor.extract_tree(&tree);
        assert_eq!(records, vec![record("Foo", "https://foo.com/x", "foo.com", "", "93%")]);
    }

    #[test]
    fn markers_sharing_a_container_search_it_once() {
        let (mut tree, body) = FakeTree::root();
        let div = tree.element(body, "div", Vec::new());
        for _ in 0..50 {
            let span = tree.element(div, "span", Vec::new());
            tree.text(span, "[2]");
        }
        let a = tree.element(div, "a", vec![("href", "https://example.com/p")]);
        tree.text(a, "Example");

        let records = MarkerLinkExtractor.extract_tree(&tree);
        assert_eq!(
            records,
            vec![record("Example", "https://example.com/p", "example.com", "2", "")]
        );
        assert_eq!(tree.descendant_visits.get(), 51);
    }

    #[test]
    fn anchor_search_stops_at_first_link() {
        let (mut tree, body) = FakeTree::root();
        let p = tree.element(body, "p", Vec::new());
        let a = tree.element(p, "a", vec![("href", "https://first.example/")]);
        tree.text(a, "First");
        for _ in 0..20 {
            tree.element(p, "i", Vec::new());
        }
        let sup = tree.element(p, "sup", Vec::new());
        tree.text(sup, "[1]");

        let records = MarkerLinkExtractor.extract_tree(&tree);
        assert_eq!(records[0].reference_id, "1");
        assert_eq!(tree.descendant_visits.get(), 1);
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tree = FakeTree::default();
        assert!(MarkerLinkExtractor.extract_tree(&tree).is_empty());
    }

    #[test]
    fn marker_parsing_is_prefix_anchored() {
        assert_eq!(parse_marker("[1]").as_deref(), Some("1"));
        assert_eq!(parse_marker("12").as_deref(), Some("12"));
        assert_eq!(parse_marker("[7").as_deref(), Some("7"));
        assert_eq!(parse_marker("123").as_deref(), Some("12"));
        assert_eq!(parse_marker("  [4]  ").as_deref(), Some("4"));
        assert_eq!(parse_marker("see [1]"), None);
        assert_eq!(parse_marker("[]"), None);
        assert_eq!(parse_marker(""), None);
    }

    #[test]
    fn confidence_requires_two_or_three_digits() {
        assert_eq!(parse_confidence("93%").as_deref(), Some("93%"));
        assert_eq!(parse_confidence("confidence: 100 %").as_deref(), Some("100%"));
        assert_eq!(parse_confidence("5%"), None);
        assert_eq!(parse_confidence("ninety percent"), None);
    }

    #[test]
    fn domain_strips_leading_www_only() {
        assert_eq!(domain_of("https://www.example.com/x"), "example.com");
        assert_eq!(domain_of("https://example.com/x"), "example.com");
        assert_eq!(domain_of("https://docs.www.example.com"), "docs.www.example.com");
        assert_eq!(domain_of("http://example.com:8080/a"), "example.com");
        assert_eq!(domain_of("/relative/path"), "");
    }

    #[test]
    fn domain_is_read_from_the_authority_text() {
        assert_eq!(domain_of("//cdn.example.com/x"), "cdn.example.com");
        assert_eq!(domain_of("https://exa mple.com/x"), "exa mple.com");
        assert_eq!(domain_of("https://example.com:99999/x"), "example.com");
        assert_eq!(domain_of("https://www.bücher.de/x"), "bücher.de");
        assert_eq!(domain_of("https://user:pw@Example.COM:8080/p"), "example.com");
        assert_eq!(domain_of("https://example.com?q=1"), "example.com");
        assert_eq!(domain_of("http://[::1]:8080/"), "[::1]");
        assert_eq!(domain_of("mailto:me@example.com"), "");
        assert_eq!(domain_of("/go?u=https://example.com"), "");
        assert_eq!(domain_of("file:///etc/hosts"), "");
    }

    #[test]
    fn web_link_check_accepts_http_schemes_only() {
        assert!(is_web_link("https://a.example"));
        assert!(is_web_link("HTTP://a.example"));
        assert!(!is_web_link("/about"));
        assert!(!is_web_link("mailto:me@example.com"));
        assert!(!is_web_link("javascript:void(0)"));
        assert!(!is_web_link("#top"));
        assert!(!is_web_link("httpfoo"));
    }
}
