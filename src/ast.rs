//! Lossless stylesheet tree
//!
//! Every node keeps the raw text around it (whitespace before the node, the
//! text between a selector and its `{`, the whitespace before a closing `}`),
//! so a parsed stylesheet prints back byte for byte. The inliner only ever
//! removes nodes or rewrites declaration values; everything else survives.

/// A parsed stylesheet: the root container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
    /// Whitespace after the last node
    pub after: String,
    /// Whether the last non-comment node was terminated by `;`
    pub semicolon: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Declaration(Declaration),
    Comment(Comment),
}

/// `selector { ... }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    /// Selector with comments dropped, used for matching
    pub selector: String,
    /// Selector as written, kept when it carried comments
    pub raw_selector: Option<String>,
    pub nodes: Vec<Node>,
    pub before: String,
    /// Raw text between the selector and `{`
    pub between: String,
    /// Whitespace before `}`
    pub after: String,
    pub semicolon: bool,
    /// A stray `;` (with its leading whitespace) directly after `}`
    pub own_semicolon: String,
    pub line: usize,
}

/// `@name params;` or `@name params { ... }`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    /// Params as written, kept when they carried comments
    pub raw_params: Option<String>,
    /// `None` for statement at-rules such as `@import`
    pub nodes: Option<Vec<Node>>,
    pub before: String,
    pub after_name: String,
    pub between: String,
    pub after: String,
    pub semicolon: bool,
    pub line: usize,
}

/// `prop: value`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declaration {
    pub prop: String,
    pub value: String,
    /// Raw ` !important` suffix, kept out of `value`
    pub important: Option<String>,
    pub before: String,
    /// Raw text between the property and the value, colon included
    pub between: String,
    /// Whitespace between the value and a terminating `;`
    pub value_after: String,
    pub line: usize,
}

/// `/* text */`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub text: String,
    pub before: String,
    pub line: usize,
}

impl Node {
    pub fn before(&self) -> &str {
        match self {
            Node::Rule(rule) => &rule.before,
            Node::AtRule(at_rule) => &at_rule.before,
            Node::Declaration(decl) => &decl.before,
            Node::Comment(comment) => &comment.before,
        }
    }

    pub fn set_before(&mut self, before: String) {
        match self {
            Node::Rule(rule) => rule.before = before,
            Node::AtRule(at_rule) => at_rule.before = before,
            Node::Declaration(decl) => decl.before = before,
            Node::Comment(comment) => comment.before = before,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }
}

impl Stylesheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visit every rule depth first in document order, including rules nested
    /// in at-rules and other rules. Returning `false` from the visitor stops
    /// the walk; the return value tells whether the walk ran to the end.
    pub fn walk_rules<F>(&self, mut visitor: F) -> bool
    where
        F: FnMut(&Rule) -> bool,
    {
        walk_rules_in(&self.nodes, &mut visitor)
    }

    /// Visit every declaration anywhere in the tree, in document order.
    pub fn walk_declarations<F>(&self, mut visitor: F)
    where
        F: FnMut(&Declaration),
    {
        walk_declarations_in(&self.nodes, &mut visitor);
    }

    /// Remove every rule whose selector is exactly `selector`, anywhere in the
    /// tree, and hand them back in document order. A removed rule takes its
    /// nested content with it.
    pub fn take_rules(&mut self, selector: &str) -> Vec<Rule> {
        let mut taken = Vec::new();
        take_rules_in(&mut self.nodes, selector, &mut taken, true);
        taken
    }

    /// Visit every declaration with mutable access. The visitor also receives
    /// the selector of the closest enclosing rule and returns whether the
    /// declaration stays in the tree.
    pub fn retain_declarations<F>(&mut self, mut visitor: F)
    where
        F: FnMut(&mut Declaration, Option<&str>) -> bool,
    {
        retain_declarations_in(&mut self.nodes, None, true, &mut visitor);
    }

    pub fn rule_count(&self) -> usize {
        let mut count = 0;
        self.walk_rules(|_| {
            count += 1;
            true
        });
        count
    }

    pub fn declaration_count(&self) -> usize {
        let mut count = 0;
        self.walk_declarations(|_| count += 1);
        count
    }
}

impl Rule {
    /// Every declaration inside this rule, nested ones included.
    pub fn declarations(&self) -> Vec<&Declaration> {
        let mut found = Vec::new();
        walk_declarations_in(&self.nodes, &mut |decl| found.push(decl));
        found
    }
}

fn walk_rules_in<'a, F>(nodes: &'a [Node], visitor: &mut F) -> bool
where
    F: FnMut(&'a Rule) -> bool,
{
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                if !visitor(rule) || !walk_rules_in(&rule.nodes, visitor) {
                    return false;
                }
            }
            Node::AtRule(AtRule { nodes: Some(children), .. }) => {
                if !walk_rules_in(children, visitor) {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

fn walk_declarations_in<'a, F>(nodes: &'a [Node], visitor: &mut F)
where
    F: FnMut(&'a Declaration),
{
    for node in nodes {
        match node {
            Node::Declaration(decl) => visitor(decl),
            Node::Rule(rule) => walk_declarations_in(&rule.nodes, visitor),
            Node::AtRule(AtRule { nodes: Some(children), .. }) => {
                walk_declarations_in(children, visitor)
            }
            _ => {}
        }
    }
}

fn take_rules_in(nodes: &mut Vec<Node>, selector: &str, taken: &mut Vec<Rule>, is_root: bool) {
    let mut index = 0;
    while index < nodes.len() {
        if matches!(&nodes[index], Node::Rule(rule) if rule.selector == selector) {
            if let Node::Rule(rule) = remove_node(nodes, index, is_root) {
                taken.push(rule);
            }
            continue;
        }

        match &mut nodes[index] {
            Node::Rule(rule) => take_rules_in(&mut rule.nodes, selector, taken, false),
            Node::AtRule(AtRule { nodes: Some(children), .. }) => {
                take_rules_in(children, selector, taken, false)
            }
            _ => {}
        }
        index += 1;
    }
}

fn retain_declarations_in<F>(
    nodes: &mut Vec<Node>,
    selector: Option<&str>,
    is_root: bool,
    visitor: &mut F,
) where
    F: FnMut(&mut Declaration, Option<&str>) -> bool,
{
    let mut index = 0;
    while index < nodes.len() {
        let keep = match &mut nodes[index] {
            Node::Declaration(decl) => visitor(decl, selector),
            Node::Rule(Rule { selector: rule_selector, nodes: children, .. }) => {
                retain_declarations_in(children, Some(rule_selector.as_str()), false, visitor);
                true
            }
            Node::AtRule(AtRule { nodes: Some(children), .. }) => {
                retain_declarations_in(children, selector, false, visitor);
                true
            }
            Node::AtRule(_) | Node::Comment(_) => true,
        };

        if keep {
            index += 1;
        } else {
            remove_node(nodes, index, is_root);
        }
    }
}

/// Removing the first top-level node passes its leading whitespace on to the
/// next one, so the output never starts with the removed node's indentation.
fn remove_node(nodes: &mut Vec<Node>, index: usize, is_root: bool) -> Node {
    if is_root && index == 0 && nodes.len() > 1 {
        let before = nodes[0].before().to_string();
        nodes[1].set_before(before);
    }
    nodes.remove(index)
}
