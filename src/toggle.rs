use std::collections::BTreeSet;

use log::{debug, warn};

use crate::error::ToggleError;
use crate::markup::{CSS_CONTAINER_TAG, Markup, NodeId, TagName};
use crate::option::{OptionChain, StyleOption, StyleRequest};
use crate::selection::{Boundary, SelectionRange};

/// Supplies a link target when a hyperlink is added without one.
pub trait TargetResolver {
    /// `None` means the prompt was cancelled; the link is still added with an empty target.
    fn resolve_target(&mut self) -> Option<String>;
}

impl<F> TargetResolver for F
where
    F: FnMut() -> Option<String>,
{
    fn resolve_target(&mut self) -> Option<String> {
        self()
    }
}

/// Resolver for callers that never prompt.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPrompt;

impl TargetResolver for NoPrompt {
    fn resolve_target(&mut self) -> Option<String> {
        None
    }
}

#[derive(Clone, Debug)]
pub struct ToggleConfig {
    repeatable: BTreeSet<TagName>,
    exclusive_groups: Vec<BTreeSet<TagName>>,
    link_tag: TagName,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        let headings = ["h1", "h2", "h3", "h4", "h5", "h6"]
            .into_iter()
            .map(TagName::new)
            .collect();
        Self {
            repeatable: BTreeSet::from([CSS_CONTAINER_TAG.clone()]),
            exclusive_groups: vec![headings],
            link_tag: TagName::new("a"),
        }
    }
}

impl ToggleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `tag` to appear more than once in a chain.
    pub fn with_repeatable_tag(mut self, tag: &str) -> Self {
        self.repeatable.insert(TagName::new(tag));
        self
    }

    pub fn without_repeatable_tag(mut self, tag: &str) -> Self {
        self.repeatable.remove(&TagName::new(tag));
        self
    }

    /// Makes the given tags replace each other, the way heading levels do.
    pub fn with_exclusive_group(mut self, tags: &[&str]) -> Self {
        self.exclusive_groups
            .push(tags.iter().map(|tag| TagName::new(tag)).collect());
        self
    }

    pub fn with_link_tag(mut self, tag: &str) -> Self {
        self.link_tag = TagName::new(tag);
        self
    }

    pub fn is_repeatable(&self, tag: &TagName) -> bool {
        self.repeatable.contains(tag)
    }

    pub fn link_tag(&self) -> &TagName {
        &self.link_tag
    }

    /// Whether a layer tagged `a` competes with one tagged `b` for a single slot.
    pub fn same_slot(&self, a: &TagName, b: &TagName) -> bool {
        a == b
            || self
                .exclusive_groups
                .iter()
                .any(|group| group.contains(a) && group.contains(b))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Outermost node inserted in place of the selection.
    pub node: NodeId,
    /// Whether the requested style is present after the toggle.
    pub applied: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ToggleEngine {
    config: ToggleConfig,
}

impl ToggleEngine {
    pub fn new(config: ToggleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToggleConfig {
        &self.config
    }

    /// Adds or removes `request` on the selected text inside `region`.
    ///
    /// The change is computed on a copy of the document and committed only when
    /// every step succeeds. On success `selection` spans the inserted content.
    pub fn toggle_style<R>(
        &self,
        markup: &mut Markup,
        region: NodeId,
        selection: Option<&mut SelectionRange>,
        request: &StyleRequest,
        resolver: &mut R,
    ) -> Result<ToggleOutcome, ToggleError>
    where
        R: TargetResolver + ?Sized,
    {
        let option = StyleOption::try_from(request)?;
        let selection = selection.ok_or(ToggleError::NoActiveSelection)?;
        check_selection(markup, region, selection)?;

        let mut working = markup.clone();
        let mut range = selection.clone();
        let contents = extract_bounding_subtree(&mut working, region, &mut range);
        let text = working.text_content(contents);

        let chain = if working.first_element_child(contents).is_some() {
            OptionChain::decompose(&working, contents)
                .inspect_err(|err| warn!("not toggling {option}: {err}"))?
        } else {
            OptionChain::new()
        };
        let chain = self.toggle_option(chain, &option, resolver);
        let applied = if option.tag_name() == self.config.link_tag() {
            chain.contains_tag(self.config.link_tag())
        } else {
            chain.contains(&option)
        };

        let node = chain.recompose(&mut working, &text);
        if !range.insert_node(&mut working, node) {
            return Err(ToggleError::SelectionOutsideRegion);
        }
        working.release(contents);
        working.drop_empty_text(region);
        range.select_node(&working, node);

        debug!(
            "{} {option} on {text:?} ({} layers)",
            if applied { "applied" } else { "removed" },
            chain.len()
        );
        *markup = working;
        *selection = range;
        Ok(ToggleOutcome { node, applied })
    }

    /// Adds `option` to the chain or removes it.
    ///
    /// Tags outside the repeatable set replace differing layers of the same tag
    /// (or of a tag in the same exclusive group, such as another heading level).
    /// The link tag ignores attributes: any existing link is stripped, otherwise
    /// a new link is added with a target from the request or the resolver.
    pub fn toggle_option<R>(
        &self,
        mut chain: OptionChain,
        option: &StyleOption,
        resolver: &mut R,
    ) -> OptionChain
    where
        R: TargetResolver + ?Sized,
    {
        let tag = option.tag_name();

        if tag == self.config.link_tag() {
            if chain.contains_tag(tag) {
                chain.retain(|entry| entry.tag_name() != tag);
            } else {
                chain.push(link_option(option, resolver));
            }
            return chain;
        }

        if !self.config.is_repeatable(tag) {
            chain.retain(|entry| {
                !self.config.same_slot(entry.tag_name(), tag) || entry == option
            });
        }

        if chain.contains(option) {
            chain.retain(|entry| entry != option);
        } else {
            chain.push(option.clone());
        }
        chain
    }

    /// The layers the next toggle would operate on, without touching the document.
    pub fn active_options(
        &self,
        markup: &Markup,
        region: NodeId,
        selection: &SelectionRange,
    ) -> Result<OptionChain, ToggleError> {
        check_selection(markup, region, selection)?;
        let mut scratch = markup.clone();
        let mut range = selection.clone();
        let contents = extract_bounding_subtree(&mut scratch, region, &mut range);
        if scratch.first_element_child(contents).is_some() {
            OptionChain::decompose(&scratch, contents)
        } else {
            Ok(OptionChain::new())
        }
    }
}

fn link_option<R>(option: &StyleOption, resolver: &mut R) -> StyleOption
where
    R: TargetResolver + ?Sized,
{
    let mut attributes = option.attributes();
    if !attributes.contains("href") {
        let target = resolver.resolve_target().unwrap_or_default();
        attributes.set("href", target);
    }
    StyleOption::tag(option.tag_name().clone(), attributes)
}

fn check_selection(
    markup: &Markup,
    region: NodeId,
    selection: &SelectionRange,
) -> Result<(), ToggleError> {
    if selection.is_collapsed() {
        return Err(ToggleError::NoActiveSelection);
    }
    let ancestor = selection
        .common_ancestor(markup)
        .ok_or(ToggleError::SelectionOutsideRegion)?;
    if !markup.is_inclusive_ancestor(region, ancestor) {
        return Err(ToggleError::SelectionOutsideRegion);
    }
    if selection.text(markup).is_empty() {
        return Err(ToggleError::NoActiveSelection);
    }
    Ok(())
}

/// Detaches the content the toggle operates on and returns it as a fragment.
///
/// When the selected text is exactly the text of the common ancestor element
/// (or of the element around a common ancestor text node), the outermost such
/// wrapper is taken whole so existing formatting is captured completely. This
/// holds even when the text is split over several sibling text nodes. The walk
/// never reaches `region` itself. Otherwise the plain range contents are
/// extracted.
pub fn extract_bounding_subtree(
    markup: &mut Markup,
    region: NodeId,
    range: &mut SelectionRange,
) -> NodeId {
    let text = range.text(markup);
    let is_bounding = |markup: &Markup, node: NodeId| {
        node != region
            && markup.is_element(node)
            && markup.is_inclusive_ancestor(region, node)
            && markup.text_content(node) == text
    };

    let mut wrapper = range
        .common_ancestor(markup)
        .and_then(|ancestor| {
            if markup.is_element(ancestor) {
                Some(ancestor)
            } else {
                markup.parent(ancestor)
            }
        })
        .filter(|node| is_bounding(markup, *node));

    if let Some(mut current) = wrapper {
        while let Some(parent) = markup.parent(current)
            && is_bounding(markup, parent)
        {
            current = parent;
        }
        wrapper = Some(current);
    }

    if let Some(bound) = wrapper
        && let Some((parent, idx)) = markup.detach(bound)
    {
        range.collapse_to(Boundary::new(parent, idx));
        let fragment = markup.create_fragment();
        markup.append_child(fragment, bound);
        return fragment;
    }

    range.extract_contents(markup)
}
