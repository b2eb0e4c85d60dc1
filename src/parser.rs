//! Lossless CSS parser
//!
//! Builds the [`Stylesheet`] tree the inliner works on from the `cssparser`
//! token stream. Selectors and values are not interpreted; statement
//! boundaries come from the tokens and every node's text is sliced straight
//! out of the source, so printing an untouched tree gives back the input
//! exactly.

use crate::ast::*;
use crate::error::{InlinerError, Result};
use cssparser::{ParseError, Parser as TokenParser, ParserInput, SourceLocation, SourcePosition, Token};
use std::mem;

/// How a statement ended
#[derive(Debug, Clone, Copy, PartialEq)]
enum Terminator {
    OpenBrace,
    Semicolon,
    /// End of input or of the enclosing block
    End,
}

/// Token classes the tree builder distinguishes
#[derive(Debug, Clone, Copy, PartialEq)]
enum Lexeme {
    Space,
    Comment,
    Semicolon,
    Colon,
    OpenBrace,
    CloseBrace,
    /// `(`, `[` or a function, skipped as one unit
    Nested,
    AtKeyword,
    BadString,
    Word,
}

impl Lexeme {
    fn of(token: &Token<'_>) -> Self {
        match token {
            Token::WhiteSpace(_) => Lexeme::Space,
            Token::Comment(_) => Lexeme::Comment,
            Token::Semicolon => Lexeme::Semicolon,
            Token::Colon => Lexeme::Colon,
            Token::CurlyBracketBlock => Lexeme::OpenBrace,
            Token::CloseCurlyBracket => Lexeme::CloseBrace,
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => Lexeme::Nested,
            Token::AtKeyword(_) => Lexeme::AtKeyword,
            Token::BadString(_) => Lexeme::BadString,
            _ => Lexeme::Word,
        }
    }
}

/// Source text of one statement token: `Space`, `Comment` or `Word`
#[derive(Debug, Clone, Copy)]
struct Fragment<'i> {
    kind: Lexeme,
    text: &'i str,
}

/// Raw text of one statement plus where its first top-level colon sits
struct Statement<'i> {
    text: &'i str,
    fragments: Vec<Fragment<'i>>,
    colon: Option<usize>,
    terminator: Terminator,
    terminator_at: SourceLocation,
}

struct Block {
    nodes: Vec<Node>,
    after: String,
    semicolon: bool,
}

/// A selector or at-rule prelude split the way the tree stores it
#[derive(Debug, PartialEq)]
struct Prelude {
    value: String,
    raw: Option<String>,
    between: String,
}

impl Prelude {
    /// Trailing whitespace and comments become `between`. A comment next to
    /// whitespace or an edge is dropped from `value`, and `raw` then keeps
    /// the text as written.
    fn split(fragments: &[Fragment<'_>]) -> Self {
        let end = fragments
            .iter()
            .rposition(|fragment| fragment.kind == Lexeme::Word)
            .map_or(0, |last| last + 1);
        let (body, tail) = fragments.split_at(end);

        let mut value = String::new();
        let mut clean = true;
        for (i, fragment) in body.iter().enumerate() {
            if fragment.kind != Lexeme::Comment {
                value.push_str(fragment.text);
                continue;
            }

            let previous = i.checked_sub(1).and_then(|p| body.get(p));
            if is_gap(previous) || is_gap(body.get(i + 1)) || value.ends_with(',') {
                clean = false;
            } else {
                value.push_str(fragment.text);
            }
        }

        Self {
            value,
            raw: (!clean).then(|| body.iter().map(|fragment| fragment.text).collect()),
            between: tail.iter().map(|fragment| fragment.text).collect(),
        }
    }
}

fn is_gap(neighbor: Option<&Fragment<'_>>) -> bool {
    neighbor.map_or(true, |fragment| fragment.kind == Lexeme::Space)
}

pub struct Parser<'i> {
    input: ParserInput<'i>,
}

impl<'i> Parser<'i> {
    pub fn new(source: &'i str) -> Self {
        Self {
            input: ParserInput::new(source),
        }
    }

    pub fn parse(&mut self) -> Result<Stylesheet> {
        let mut tokens = TokenParser::new(&mut self.input);
        let block = parse_block(&mut tokens)?;
        Ok(Stylesheet {
            nodes: block.nodes,
            after: block.after,
            semicolon: block.semicolon,
        })
    }
}

/// Next token with its class, start position and location. `None` at the end
/// of input or of the enclosing block.
fn next_lexeme(input: &mut TokenParser<'_, '_>) -> Option<(Lexeme, SourcePosition, SourceLocation)> {
    let start = input.position();
    let location = input.current_source_location();
    let lexeme = input.next_including_whitespace_and_comments().ok().map(Lexeme::of)?;
    Some((lexeme, start, location))
}

/// 1-based line and column
fn line_column(location: SourceLocation) -> (usize, usize) {
    (location.line as usize + 1, location.column as usize)
}

fn error_at(location: SourceLocation, message: impl Into<String>) -> InlinerError {
    let (line, column) = line_column(location);
    InlinerError::parse(line, column, message)
}

/// Parse nodes until the end of the current block. At top level a `}` with
/// no opening brace is an error.
fn parse_block(input: &mut TokenParser<'_, '_>) -> Result<Block> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut spaces = String::new();
    let mut semicolon = false;

    loop {
        let state = input.state();
        let Some((lexeme, start, location)) = next_lexeme(input) else {
            break;
        };

        match lexeme {
            Lexeme::Space => spaces.push_str(input.slice_from(start)),
            Lexeme::CloseBrace => return Err(error_at(location, "Unexpected }")),
            Lexeme::Semicolon => {
                spaces.push(';');
                if let Some(Node::Rule(rule)) = nodes.last_mut() {
                    if rule.own_semicolon.is_empty() {
                        rule.own_semicolon = mem::take(&mut spaces);
                    }
                }
            }
            Lexeme::Comment => {
                let text = comment_text(input.slice_from(start), location)?;
                nodes.push(Node::Comment(Comment {
                    text: text.to_string(),
                    before: mem::take(&mut spaces),
                    line: line_column(location).0,
                }));
            }
            Lexeme::AtKeyword => {
                let name = input.slice_from(start)[1..].to_string();
                let at_rule = parse_at_rule(input, name, mem::take(&mut spaces), location)?;
                semicolon = at_rule.nodes.is_none() && at_rule.semicolon;
                nodes.push(Node::AtRule(at_rule));
            }
            _ => {
                input.reset(&state);
                let statement = read_statement(input)?;
                let before = mem::take(&mut spaces);

                if statement.terminator == Terminator::OpenBrace {
                    nodes.push(Node::Rule(parse_rule(input, statement, before, location)?));
                    semicolon = false;
                } else {
                    let (decl, trailing) = parse_declaration(statement, before, location)?;
                    semicolon = trailing.is_none();
                    if let Some(trailing) = trailing {
                        spaces.push_str(&trailing);
                    }
                    nodes.push(Node::Declaration(decl));
                }
            }
        }
    }

    Ok(Block {
        nodes,
        after: spaces,
        semicolon,
    })
}

/// Called right after `read_statement` stopped at `{`.
fn parse_rule<'i>(
    input: &mut TokenParser<'i, '_>,
    statement: Statement<'i>,
    before: String,
    location: SourceLocation,
) -> Result<Rule> {
    let prelude = Prelude::split(&statement.fragments);
    let block = parse_nested_body(input, statement.terminator_at)?;

    Ok(Rule {
        selector: prelude.value,
        raw_selector: prelude.raw,
        nodes: block.nodes,
        before,
        between: prelude.between,
        after: block.after,
        semicolon: block.semicolon,
        own_semicolon: String::new(),
        line: line_column(location).0,
    })
}

/// The at-keyword itself has already been consumed.
fn parse_at_rule(
    input: &mut TokenParser<'_, '_>,
    name: String,
    before: String,
    location: SourceLocation,
) -> Result<AtRule> {
    let mut after_name = String::new();
    loop {
        let state = input.state();
        match next_lexeme(input) {
            Some((Lexeme::Space, start, _)) => after_name.push_str(input.slice_from(start)),
            Some(_) => {
                input.reset(&state);
                break;
            }
            None => break,
        }
    }

    let statement = read_statement(input)?;
    let prelude = Prelude::split(&statement.fragments);
    let mut at_rule = AtRule {
        name,
        params: prelude.value,
        raw_params: prelude.raw,
        nodes: None,
        before,
        after_name,
        between: prelude.between,
        after: String::new(),
        semicolon: false,
        line: line_column(location).0,
    };

    match statement.terminator {
        Terminator::OpenBrace => {
            let block = parse_nested_body(input, statement.terminator_at)?;
            at_rule.nodes = Some(block.nodes);
            at_rule.after = block.after;
            at_rule.semicolon = block.semicolon;
        }
        Terminator::Semicolon => at_rule.semicolon = true,
        Terminator::End => {}
    }

    Ok(at_rule)
}

/// Parse the contents of the `{}` block whose opening token was just read.
/// The tokenizer closes blocks silently at the end of input; the tree does
/// not accept that.
fn parse_nested_body(input: &mut TokenParser<'_, '_>, opened_at: SourceLocation) -> Result<Block> {
    let (block, inner_end) = input
        .parse_nested_block(|body| {
            let block = parse_block(body);
            Ok::<_, ParseError<'_, ()>>((block, body.position()))
        })
        .map_err(|_| error_at(opened_at, "Unclosed block"))?;
    let block = block?;

    if input.slice_from(inner_end).is_empty() {
        return Err(error_at(opened_at, "Unclosed block"));
    }
    Ok(block)
}

/// Skip the contents of the `(`, `[` or function token just read.
fn skip_nested(input: &mut TokenParser<'_, '_>, opened_at: SourceLocation) -> Result<()> {
    let inner_end = input
        .parse_nested_block(|contents| {
            while contents.next_including_whitespace_and_comments().is_ok() {}
            Ok::<_, ParseError<'_, ()>>(contents.position())
        })
        .map_err(|_| error_at(opened_at, "Unclosed bracket"))?;

    if input.slice_from(inner_end).is_empty() {
        return Err(error_at(opened_at, "Unclosed bracket"));
    }
    Ok(())
}

/// Read up to the next `{`, `;` or the end of the enclosing block. `{` and
/// `;` are consumed but not part of the text.
fn read_statement<'i>(input: &mut TokenParser<'i, '_>) -> Result<Statement<'i>> {
    let start = input.position();
    let mut fragments = Vec::new();
    let mut colon = None;

    loop {
        let offset = input.slice_from(start).len();
        let Some((lexeme, token_start, location)) = next_lexeme(input) else {
            return Ok(Statement {
                text: input.slice_from(start),
                fragments,
                colon,
                terminator: Terminator::End,
                terminator_at: input.current_source_location(),
            });
        };

        let terminator = match lexeme {
            Lexeme::OpenBrace => Some(Terminator::OpenBrace),
            Lexeme::Semicolon => Some(Terminator::Semicolon),
            _ => None,
        };
        if let Some(terminator) = terminator {
            return Ok(Statement {
                text: &input.slice_from(start)[..offset],
                fragments,
                colon,
                terminator,
                terminator_at: location,
            });
        }

        match lexeme {
            Lexeme::CloseBrace => return Err(error_at(location, "Unexpected }")),
            Lexeme::BadString => return Err(error_at(location, "Unclosed string")),
            Lexeme::Comment => {
                comment_text(input.slice_from(token_start), location)?;
            }
            Lexeme::Nested => skip_nested(input, location)?,
            Lexeme::Colon if colon.is_none() => colon = Some(offset),
            _ => {}
        }

        let kind = match lexeme {
            Lexeme::Space | Lexeme::Comment => lexeme,
            _ => Lexeme::Word,
        };
        fragments.push(Fragment {
            kind,
            text: input.slice_from(token_start),
        });
    }
}

/// Comment body without its markers. The tokenizer accepts a comment cut off
/// by the end of input; the tree does not.
fn comment_text(raw: &str, location: SourceLocation) -> Result<&str> {
    raw.strip_prefix("/*")
        .and_then(|body| body.strip_suffix("*/"))
        .ok_or_else(|| error_at(location, "Unclosed comment"))
}

/// Split a `prop: value` statement. Whitespace after the value goes to
/// `value_after` when the statement ended with `;`, otherwise it is handed
/// back to the enclosing block as the second element.
fn parse_declaration(
    statement: Statement<'_>,
    before: String,
    location: SourceLocation,
) -> Result<(Declaration, Option<String>)> {
    let Some(colon) = statement.colon else {
        return Err(error_at(
            location,
            format!("Unknown word '{}'", statement.text.trim()),
        ));
    };

    let (prop_part, rest) = statement.text.split_at(colon);
    let rest = &rest[1..];
    let (prop, prop_spaces) = split_trailing_whitespace(prop_part);
    let value_start = rest.len() - rest.trim_start().len();
    let (value, value_spaces) = split_trailing_whitespace(&rest[value_start..]);
    let (value, important) = split_important(value);

    let mut decl = Declaration {
        prop: prop.to_string(),
        value: value.to_string(),
        important: important.map(str::to_string),
        before,
        between: format!("{}:{}", prop_spaces, &rest[..value_start]),
        value_after: String::new(),
        line: line_column(location).0,
    };

    if statement.terminator == Terminator::Semicolon {
        decl.value_after = value_spaces.to_string();
        Ok((decl, None))
    } else {
        Ok((decl, Some(value_spaces.to_string())))
    }
}

/// `"red !important"` → `("red", Some(" !important"))`
fn split_important(value: &str) -> (&str, Option<&str>) {
    let Some(bang) = value.rfind('!') else {
        return (value, None);
    };
    if !value[bang + 1..].trim().eq_ignore_ascii_case("important") {
        return (value, None);
    }
    let start = value[..bang].trim_end().len();
    (&value[..start], Some(&value[start..]))
}

fn split_trailing_whitespace(text: &str) -> (&str, &str) {
    let end = text.trim_end().len();
    text.split_at(end)
}

/// Parse CSS source into a lossless tree.
pub fn parse(source: &str) -> Result<Stylesheet> {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stringify::stringify;

    fn round_trip(source: &str) {
        let sheet = parse(source).unwrap();
        assert_eq!(stringify(&sheet), source);
    }

    fn first_rule(sheet: &Stylesheet) -> &Rule {
        match &sheet.nodes[0] {
            Node::Rule(rule) => rule,
            other => panic!("expected rule, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip_preserves_formatting() {
        round_trip("h1 { color: red; }");
        round_trip(":root {\n  --a: 1px;\n  --b : var(--a) ;\n}\n\n.x{margin:0 auto}\n");
        round_trip("a { color: red !important; background: blue ! IMPORTANT }");
        round_trip("/* head */\n@import url(\"a.css\");\n@media (min-width: 10px) {\n  a { b: c; }\n}\n");
        round_trip("a{};\nb { c: d }  ");
        round_trip(":root {}\n:root.dark[data-theme=\"}\"] { --x: '{;}' }");
        round_trip(".a { background: url(data:image/png;base64,AAAA); }");
        round_trip("a { /* inline */ color: red; /* trailing */ }");
        round_trip(":root /* vars */ { --a: 1px; }\n@media /* m */ print /* p */ { a, /* b */ b { c: d } }");
        round_trip("");
    }

    #[test]
    fn test_parse_rule_structure() {
        let sheet = parse(":root { --c: #ff0000; }\nh1 { color: var(--c); }").unwrap();
        assert_eq!(sheet.nodes.len(), 2);

        let root = first_rule(&sheet);
        assert_eq!(root.selector, ":root");
        assert_eq!(root.raw_selector, None);
        assert_eq!(root.between, " ");
        assert!(root.semicolon);

        let decls = root.declarations();
        assert_eq!(decls[0].prop, "--c");
        assert_eq!(decls[0].value, "#ff0000");
        assert_eq!(decls[0].between, ": ");
        assert_eq!(decls[0].line, 1);
    }

    #[test]
    fn test_selector_comments_are_kept_out_of_selector() {
        let sheet = parse(":root /* vars */ { --a: 1px; }").unwrap();
        let rule = first_rule(&sheet);
        assert_eq!(rule.selector, ":root");
        assert_eq!(rule.between, " /* vars */ ");

        let sheet = parse("a /* x */, b { c: d }").unwrap();
        let rule = first_rule(&sheet);
        assert_eq!(rule.selector, "a , b");
        assert_eq!(rule.raw_selector.as_deref(), Some("a /* x */, b"));

        let sheet = parse("a/**/b { c: d }").unwrap();
        assert_eq!(first_rule(&sheet).selector, "a/**/b");
    }

    #[test]
    fn test_parse_important() {
        let sheet = parse("a { color: var(--c) !important; }").unwrap();
        let mut found = Vec::new();
        sheet.walk_declarations(|decl| found.push(decl.clone()));

        assert_eq!(found[0].value, "var(--c)");
        assert_eq!(found[0].important.as_deref(), Some(" !important"));
    }

    #[test]
    fn test_trailing_whitespace_without_semicolon_belongs_to_rule() {
        let sheet = parse("a { color: red  }").unwrap();
        let rule = first_rule(&sheet);

        assert!(!rule.semicolon);
        assert_eq!(rule.after, "  ");
        assert_eq!(rule.declarations()[0].value, "red");
    }

    #[test]
    fn test_nested_rules_and_at_rules() {
        let sheet = parse("@media print { :root { --a: 1px; } .b { width: var(--a); } }").unwrap();
        assert_eq!(sheet.rule_count(), 2);
        assert_eq!(sheet.declaration_count(), 2);

        let Node::AtRule(media) = &sheet.nodes[0] else {
            panic!("expected at-rule");
        };
        assert_eq!(media.name, "media");
        assert_eq!(media.params, "print");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("a { color: red;"), Err(InlinerError::Parse { .. })));
        assert!(matches!(parse("a { color }"), Err(InlinerError::Parse { .. })));
        assert!(matches!(parse("}"), Err(InlinerError::Parse { .. })));
        assert!(matches!(parse("/* open"), Err(InlinerError::Parse { .. })));
        assert!(matches!(parse("a { content: \"x }"), Err(InlinerError::Parse { .. })));
        assert!(matches!(parse("a { width: calc(1px + 2px; }"), Err(InlinerError::Parse { .. })));
    }

    #[test]
    fn test_unknown_word_position() {
        match parse("a {\n  color\n}") {
            Err(InlinerError::Parse { line, column, message }) => {
                assert_eq!(line, 2);
                assert_eq!(column, 3);
                assert!(message.contains("Unknown word"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
