//! Stylesheet tree back to CSS text

use crate::ast::*;
use std::fmt;

pub struct Stringifier {
    output: String,
}

impl Stringifier {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    pub fn stringify(mut self, sheet: &Stylesheet) -> String {
        self.body(&sheet.nodes, sheet.semicolon);
        self.output.push_str(&sheet.after);
        self.output
    }

    /// Every non-comment child except the last gets a `;`; the last one only
    /// if the source had one.
    fn body(&mut self, nodes: &[Node], semicolon: bool) {
        let mut last = nodes.len().saturating_sub(1);
        while last > 0 && nodes[last].is_comment() {
            last -= 1;
        }

        for (index, node) in nodes.iter().enumerate() {
            self.output.push_str(node.before());
            self.node(node, index != last || semicolon);
        }
    }

    fn node(&mut self, node: &Node, semicolon: bool) {
        match node {
            Node::Declaration(decl) => self.declaration(decl, semicolon),
            Node::Rule(rule) => self.rule(rule),
            Node::AtRule(at_rule) => self.at_rule(at_rule, semicolon),
            Node::Comment(comment) => {
                self.output.push_str("/*");
                self.output.push_str(&comment.text);
                self.output.push_str("*/");
            }
        }
    }

    fn declaration(&mut self, decl: &Declaration, semicolon: bool) {
        self.output.push_str(&decl.prop);
        self.output.push_str(&decl.between);
        self.output.push_str(&decl.value);
        if let Some(important) = &decl.important {
            self.output.push_str(important);
        }
        if semicolon {
            self.output.push_str(&decl.value_after);
            self.output.push(';');
        }
    }

    fn rule(&mut self, rule: &Rule) {
        self.output.push_str(rule.raw_selector.as_deref().unwrap_or(&rule.selector));
        self.output.push_str(&rule.between);
        self.block(&rule.nodes, &rule.after, rule.semicolon);
        self.output.push_str(&rule.own_semicolon);
    }

    fn at_rule(&mut self, at_rule: &AtRule, semicolon: bool) {
        self.output.push('@');
        self.output.push_str(&at_rule.name);
        self.output.push_str(&at_rule.after_name);
        self.output.push_str(at_rule.raw_params.as_deref().unwrap_or(&at_rule.params));
        self.output.push_str(&at_rule.between);
        match &at_rule.nodes {
            Some(children) => self.block(children, &at_rule.after, at_rule.semicolon),
            None if semicolon => self.output.push(';'),
            None => {}
        }
    }

    fn block(&mut self, nodes: &[Node], after: &str, semicolon: bool) {
        self.output.push('{');
        self.body(nodes, semicolon);
        self.output.push_str(after);
        self.output.push('}');
    }
}

impl Default for Stringifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Print a stylesheet back to CSS text.
pub fn stringify(sheet: &Stylesheet) -> String {
    Stringifier::new().stringify(sheet)
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringify(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify_rule_with_declarations() {
        let sheet = Stylesheet {
            nodes: vec![Node::Rule(Rule {
                selector: "h1".to_string(),
                between: " ".to_string(),
                after: " ".to_string(),
                semicolon: true,
                nodes: vec![Node::Declaration(Declaration {
                    prop: "color".to_string(),
                    between: ": ".to_string(),
                    value: "red".to_string(),
                    before: " ".to_string(),
                    ..Default::default()
                })],
                ..Default::default()
            })],
            ..Default::default()
        };

        assert_eq!(stringify(&sheet), "h1 { color: red; }");
    }

    #[test]
    fn test_last_declaration_semicolon_follows_source() {
        let decl = |prop: &str| {
            Node::Declaration(Declaration {
                prop: prop.to_string(),
                between: ":".to_string(),
                value: "0".to_string(),
                ..Default::default()
            })
        };
        let sheet = Stylesheet {
            nodes: vec![Node::Rule(Rule {
                selector: "a".to_string(),
                nodes: vec![decl("margin"), decl("padding")],
                semicolon: false,
                ..Default::default()
            })],
            ..Default::default()
        };

        assert_eq!(sheet.to_string(), "a{margin:0;padding:0}");
    }

    #[test]
    fn test_statement_at_rule_and_comment() {
        let sheet = Stylesheet {
            nodes: vec![
                Node::AtRule(AtRule {
                    name: "import".to_string(),
                    after_name: " ".to_string(),
                    params: "\"a.css\"".to_string(),
                    ..Default::default()
                }),
                Node::Comment(Comment {
                    text: " note ".to_string(),
                    before: "\n".to_string(),
                    ..Default::default()
                }),
            ],
            semicolon: true,
            after: "\n".to_string(),
        };

        assert_eq!(stringify(&sheet), "@import \"a.css\";\n/* note */\n");
    }
}
