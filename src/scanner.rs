//! Block-presence scanning.
//!
//! The composer needs one fact about a page before it picks a layout: does
//! the page already declare `{% block body %}`? Answering that with a full
//! parse would reject pages that are only valid once they extend a layout,
//! so this module only walks the engine's token stream.
//!
//! Tokens come from `minijinja`'s own lexer, so tag delimiters, comments
//! and `{% raw %}` sections are recognized exactly as the renderer sees
//! them. The scan stops at the first lex error and answers from whatever
//! came before it.

use minijinja::machinery::{self, Token, WhitespaceConfig};
use minijinja::syntax::SyntaxConfig;

/// Tokens of `source` up to the first lex error.
fn tokens(source: &str) -> impl Iterator<Item = Token<'_>> {
    machinery::tokenize(
        source,
        false,
        SyntaxConfig::default(),
        WhitespaceConfig::default(),
    )
    .map_while(Result::ok)
    .map(|(token, _span)| token)
}

/// Whether `source` contains a `{% block <name> %}` opening tag.
///
/// Only the opening tag is inspected, so a template that fails to parse for
/// other reasons still answers correctly. Any matching tag anywhere counts.
pub fn contains_block(source: &str, name: &str) -> bool {
    let mut tokens = tokens(source);
    while let Some(token) = tokens.next() {
        if !matches!(token, Token::BlockStart) {
            continue;
        }
        if !matches!(tokens.next(), Some(Token::Ident("block"))) {
            continue;
        }
        if matches!(tokens.next(), Some(Token::Ident(ident)) if ident == name) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_block() {
        assert!(contains_block("<main>{% block body %}{% endblock %}</main>", "body"));
    }

    #[test]
    fn finds_block_without_whitespace() {
        assert!(contains_block("{%block body%}{%endblock%}", "body"));
        assert!(contains_block("{%- block body -%}x{% endblock %}", "body"));
    }

    #[test]
    fn ignores_other_block_names() {
        assert!(!contains_block("{% block header %}{% endblock %}", "body"));
        assert!(!contains_block("{% block bodyguard %}{% endblock %}", "body"));
    }

    #[test]
    fn ignores_non_block_tags() {
        assert!(!contains_block("{% set body = 1 %}{{ body }}", "body"));
        assert!(!contains_block("{% endblock body %}", "body"));
    }

    #[test]
    fn ignores_plain_text() {
        assert!(!contains_block("block body", "body"));
        assert!(!contains_block("", "body"));
    }

    #[test]
    fn ignores_commented_block() {
        assert!(!contains_block("{# {% block body %} #}", "body"));
    }

    #[test]
    fn ignores_block_inside_raw() {
        assert!(!contains_block("{% raw %}{% block body %}{% endraw %}", "body"));
        assert!(contains_block(
            "{% raw %}x{% endraw %}{% block body %}{% endblock %}",
            "body"
        ));
    }

    #[test]
    fn parse_errors_do_not_matter() {
        assert!(contains_block("{% if %}{% block body %}{% endblock %}", "body"));
    }

    #[test]
    fn answers_from_prefix_before_lex_error() {
        assert!(contains_block("{% block body %}x{% endblock %}{{ 'open", "body"));
        assert!(!contains_block("{{ 'open {% block body %}", "body"));
    }

    #[test]
    fn duplicate_blocks_are_irrelevant() {
        let src = "{% block body %}a{% endblock %}{% block body %}b{% endblock %}";
        assert!(contains_block(src, "body"));
    }

    #[test]
    fn string_contents_are_not_tags() {
        assert!(!contains_block("{{ '{% block body %}' }}", "body"));
    }
}
