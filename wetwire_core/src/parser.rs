//! A hand-written tokenizer and recursive-descent parser for the
//! Go-subset grammar `discover` needs.
//!
//! There is no Go-parsing crate in the dependency corpus, and pulling
//! one in would mean fabricating a dependency that doesn't exist for
//! this ecosystem; the grammar this needs (package clause, import
//! block, top-level `var` declarations and their initializer trees) is
//! small enough to hand-roll, the way `shipcat_definitions::vault`
//! hand-rolls its own tiny secret-value parser rather than reaching for
//! a general HCL/HashiCorp config library.

use crate::ast::{Decl, Element, Expr, File, Import, Literal, UnaryOp, ValueSpec};
use crate::token::{Line, Tok};
use crate::Result;

/// Parse a single source file's bytes into a `File` AST.
///
/// Fatal for callers using single-file discovery; directory discovery
/// catches this and logs+skips the offending file.
pub fn parse(src: &str) -> Result<File> {
    let tokens = lex(src)?;
    let mut p = Parser {
        toks: tokens,
        pos: 0,
    };
    p.parse_file()
}

#[derive(Debug, Fail)]
pub enum ParseErrorKind {
    #[fail(display = "line {}: unexpected character {:?}", _0, _1)]
    UnexpectedChar(Line, char),
    #[fail(display = "line {}: unterminated string literal", _0)]
    UnterminatedString(Line),
    #[fail(display = "line {}: expected {}, found {}", _0, _1, _2)]
    Expected(Line, &'static str, Tok),
    #[fail(display = "line {}: expected a top-level declaration", _0)]
    ExpectedDecl(Line),
}

fn lex(src: &str) -> Result<Vec<(Tok, Line)>> {
    let mut out = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut line: Line = 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    i += 1;
                }
                i += 2;
            }
            '(' => {
                out.push((Tok::LParen, line));
                i += 1;
            }
            ')' => {
                out.push((Tok::RParen, line));
                i += 1;
            }
            '{' => {
                out.push((Tok::LBrace, line));
                i += 1;
            }
            '}' => {
                out.push((Tok::RBrace, line));
                i += 1;
            }
            '[' => {
                out.push((Tok::LBracket, line));
                i += 1;
            }
            ']' => {
                out.push((Tok::RBracket, line));
                i += 1;
            }
            ',' => {
                out.push((Tok::Comma, line));
                i += 1;
            }
            '.' => {
                out.push((Tok::Dot, line));
                i += 1;
            }
            ':' => {
                out.push((Tok::Colon, line));
                i += 1;
            }
            ';' => {
                out.push((Tok::Semi, line));
                i += 1;
            }
            '&' => {
                out.push((Tok::Amp, line));
                i += 1;
            }
            '*' => {
                out.push((Tok::Star, line));
                i += 1;
            }
            '=' => {
                out.push((Tok::Assign, line));
                i += 1;
            }
            '"' | '`' => {
                let quote = c;
                let start_line = line;
                i += 1;
                let mut s = String::new();
                loop {
                    if i >= chars.len() {
                        bail!(ParseErrorKind::UnterminatedString(start_line));
                    }
                    if chars[i] == quote {
                        i += 1;
                        break;
                    }
                    if chars[i] == '\\' && quote == '"' && i + 1 < chars.len() {
                        s.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    s.push(chars[i]);
                    i += 1;
                }
                out.push((Tok::String(s), start_line));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        is_float = true;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if is_float {
                    out.push((Tok::Float(text.parse().unwrap_or(0.0)), line));
                } else {
                    out.push((Tok::Int(text.parse().unwrap_or(0)), line));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let tok = match word.as_str() {
                    "package" => Tok::Package,
                    "import" => Tok::Import,
                    "var" => Tok::Var,
                    "func" => Tok::Func,
                    "const" => Tok::Const,
                    "type" => Tok::Type,
                    "struct" => Tok::Struct,
                    "return" => Tok::Return,
                    "true" => Tok::Bool(true),
                    "false" => Tok::Bool(false),
                    _ => Tok::Ident(word),
                };
                out.push((tok, line));
            }
            other => bail!(ParseErrorKind::UnexpectedChar(line, other)),
        }
    }
    out.push((Tok::Eof, line));
    Ok(out)
}

struct Parser {
    toks: Vec<(Tok, Line)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.toks[self.pos].0
    }

    fn line(&self) -> Line {
        self.toks[self.pos].1
    }

    fn advance(&mut self) -> Tok {
        let t = self.toks[self.pos].0.clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, tok: &Tok, what: &'static str) -> Result<()> {
        if self.peek() == tok {
            self.advance();
            Ok(())
        } else {
            bail!(ParseErrorKind::Expected(self.line(), what, self.peek().clone()))
        }
    }

    fn ident_name(&mut self, what: &'static str) -> Result<String> {
        match self.advance() {
            Tok::Ident(s) => Ok(s),
            other => bail!(ParseErrorKind::Expected(self.line(), what, other)),
        }
    }

    fn parse_file(&mut self) -> Result<File> {
        let mut file = File::default();
        if self.peek() == &Tok::Package {
            self.advance();
            file.package = self.ident_name("package name")?;
        }
        if self.peek() == &Tok::Import {
            self.advance();
            file.imports = self.parse_import_block()?;
        }
        while self.peek() != &Tok::Eof {
            match self.peek().clone() {
                Tok::Var => {
                    self.advance();
                    file.decls.push(Decl::Var(self.parse_var_block()?));
                }
                Tok::Func | Tok::Const | Tok::Type => {
                    self.skip_other_decl();
                    file.decls.push(Decl::Other);
                }
                Tok::Eof => break,
                _ => bail!(ParseErrorKind::ExpectedDecl(self.line())),
            }
        }
        Ok(file)
    }

    fn parse_import_block(&mut self) -> Result<Vec<Import>> {
        let mut imports = Vec::new();
        if self.peek() == &Tok::LParen {
            self.advance();
            while self.peek() != &Tok::RParen {
                imports.push(self.parse_one_import()?);
            }
            self.advance(); // )
        } else {
            imports.push(self.parse_one_import()?);
        }
        Ok(imports)
    }

    fn parse_one_import(&mut self) -> Result<Import> {
        let alias = if let Tok::Ident(_) = self.peek() {
            Some(self.ident_name("import alias")?)
        } else {
            None
        };
        let path = match self.advance() {
            Tok::String(s) => s,
            other => bail!(ParseErrorKind::Expected(self.line(), "import path string", other)),
        };
        Ok(Import { alias, path })
    }

    /// `var X = ...` or `var ( X = ...\n Y = ... )`.
    fn parse_var_block(&mut self) -> Result<Vec<ValueSpec>> {
        let mut specs = Vec::new();
        if self.peek() == &Tok::LParen {
            self.advance();
            while self.peek() != &Tok::RParen {
                specs.push(self.parse_value_spec()?);
            }
            self.advance();
        } else {
            specs.push(self.parse_value_spec()?);
        }
        Ok(specs)
    }

    fn parse_value_spec(&mut self) -> Result<ValueSpec> {
        let line = self.line();
        let name = self.ident_name("variable name")?;

        let typ = if self.peek() != &Tok::Assign && !self.starts_terminator() {
            Some(self.parse_type_expr()?)
        } else {
            None
        };

        let value = if self.peek() == &Tok::Assign {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(ValueSpec {
            name,
            line,
            typ,
            value,
        })
    }

    fn starts_terminator(&self) -> bool {
        matches!(self.peek(), Tok::Semi | Tok::Eof | Tok::RParen)
    }

    fn parse_type_expr(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Tok::Star => {
                self.advance();
                Ok(Expr::Pointer(Box::new(self.parse_type_expr()?)))
            }
            Tok::LBracket => {
                self.advance();
                self.eat(&Tok::RBracket, "`]`")?;
                Ok(Expr::Slice(Box::new(self.parse_type_expr()?)))
            }
            Tok::Ident(ref name) if name == "map" && self.peek_ahead_is_lbracket() => {
                self.parse_map_type()
            }
            Tok::Ident(_) => self.parse_selector_chain(),
            other => bail!(ParseErrorKind::Expected(self.line(), "type expression", other)),
        }
    }

    fn peek_ahead_is_lbracket(&self) -> bool {
        self.toks.get(self.pos + 1).map(|(t, _)| t) == Some(&Tok::LBracket)
    }

    /// `map[K]V`, consumed as `map` `[` K `]` V. The key type is parsed
    /// and discarded — nothing downstream of discovery cares about a
    /// Go map's declared key type, only its literal's string keys.
    fn parse_map_type(&mut self) -> Result<Expr> {
        self.advance(); // "map"
        self.eat(&Tok::LBracket, "`[`")?;
        let _key_ty = self.parse_type_expr()?;
        self.eat(&Tok::RBracket, "`]`")?;
        let value_ty = self.parse_type_expr()?;
        Ok(Expr::Slice(Box::new(value_ty)))
    }

    fn parse_selector_chain(&mut self) -> Result<Expr> {
        let base = self.ident_name("identifier")?;
        let mut e = Expr::Ident(base);
        while self.peek() == &Tok::Dot {
            self.advance();
            let name = self.ident_name("selector field")?;
            e = Expr::Selector(Box::new(e), name);
        }
        Ok(e)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Tok::Amp => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::AddressOf, Box::new(self.parse_expr()?)))
            }
            Tok::String(s) => {
                self.advance();
                Ok(Expr::BasicLit(Literal::String(s)))
            }
            Tok::Int(n) => {
                self.advance();
                Ok(Expr::BasicLit(Literal::Int(n)))
            }
            Tok::Float(x) => {
                self.advance();
                Ok(Expr::BasicLit(Literal::Float(x)))
            }
            Tok::Bool(b) => {
                self.advance();
                Ok(Expr::BasicLit(Literal::Bool(b)))
            }
            Tok::LBracket => {
                // []T{...}
                self.advance();
                self.eat(&Tok::RBracket, "`]`")?;
                let elem_ty = self.parse_type_expr()?;
                let typ = Expr::Slice(Box::new(elem_ty));
                self.finish_postfix(typ)
            }
            Tok::Ident(ref name) if name == "map" && self.peek_ahead_is_lbracket() => {
                let typ = self.parse_map_type()?;
                self.finish_postfix(typ)
            }
            Tok::Ident(_) => {
                let base = self.parse_selector_chain()?;
                self.finish_postfix(base)
            }
            Tok::LBrace => {
                // untyped composite literal, e.g. nested struct field value.
                self.parse_composite_lit(None)
            }
            other => bail!(ParseErrorKind::Expected(self.line(), "expression", other)),
        }
    }

    /// After parsing a selector/type expression, it may be followed by a
    /// composite literal (`T{...}`) or a call (`f(...)`).
    fn finish_postfix(&mut self, base: Expr) -> Result<Expr> {
        match self.peek() {
            Tok::LBrace => self.parse_composite_lit(Some(Box::new(base))),
            Tok::LParen => {
                self.advance();
                let mut args = Vec::new();
                while self.peek() != &Tok::RParen {
                    args.push(self.parse_expr()?);
                    if self.peek() == &Tok::Comma {
                        self.advance();
                    }
                }
                self.advance();
                Ok(Expr::Call(Box::new(base), args))
            }
            _ => Ok(base),
        }
    }

    fn parse_composite_lit(&mut self, typ: Option<Box<Expr>>) -> Result<Expr> {
        self.eat(&Tok::LBrace, "`{`")?;
        let mut elts = Vec::new();
        while self.peek() != &Tok::RBrace {
            let first = self.parse_expr()?;
            if self.peek() == &Tok::Colon {
                self.advance();
                let key = match first {
                    Expr::Ident(name) => Some(name),
                    // `map[string]T{"key": value}` string-keyed entries.
                    Expr::BasicLit(Literal::String(s)) => Some(s),
                    _ => None,
                };
                let value = self.parse_expr()?;
                elts.push(Element { key, value });
            } else {
                elts.push(Element {
                    key: None,
                    value: first,
                });
            }
            if self.peek() == &Tok::Comma {
                self.advance();
            }
        }
        self.advance(); // }
        Ok(Expr::CompositeLit { typ, elts })
    }

    /// Skip a `func`/`const`/`type` declaration we don't model, by
    /// balancing braces/parens until we fall back to top-level depth.
    fn skip_other_decl(&mut self) {
        self.advance(); // the keyword
        let mut depth = 0i32;
        loop {
            match self.peek() {
                Tok::LBrace | Tok::LParen => {
                    depth += 1;
                    self.advance();
                }
                Tok::RBrace | Tok::RParen => {
                    depth -= 1;
                    self.advance();
                    if depth <= 0 {
                        break;
                    }
                }
                Tok::Eof => break,
                Tok::Var | Tok::Func | Tok::Const | Tok::Type if depth == 0 => break,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_package_and_import() {
        let src = r#"
            package manifests
            import corev1 "k8s.io/api/core/v1"
            var X = corev1.ConfigMap{}
        "#;
        let f = parse(src).unwrap();
        assert_eq!(f.package, "manifests");
        assert_eq!(f.imports.len(), 1);
        assert_eq!(f.imports[0].alias.as_deref(), Some("corev1"));
        assert_eq!(f.imports[0].path, "k8s.io/api/core/v1");
    }

    #[test]
    fn parses_addr_of_composite_literal_with_qualifier() {
        let src = r#"
            var AppConfig = &corev1.ConfigMap{
                Name: "my-config",
                Data: map[string]string{"a": "b"},
            }
        "#;
        let f = parse(src).unwrap();
        match &f.decls[0] {
            Decl::Var(specs) => {
                assert_eq!(specs.len(), 1);
                let v = specs[0].value.as_ref().unwrap();
                match v {
                    Expr::Unary(UnaryOp::AddressOf, inner) => {
                        assert_eq!(
                            inner.kind_qualifier(),
                            Some(("corev1".to_string().into(), "ConfigMap".to_string()))
                        );
                    }
                    other => panic!("expected unary address-of, got {:?}", other),
                }
            }
            other => panic!("expected var decl, got {:?}", other),
        }
    }

    #[test]
    fn parses_explicit_pointer_type_binding() {
        let src = r#"
            var WebApp *appsv1.Deployment
        "#;
        let f = parse(src).unwrap();
        match &f.decls[0] {
            Decl::Var(specs) => {
                let t = specs[0].typ.as_ref().unwrap();
                assert_eq!(
                    t.kind_qualifier(),
                    Some(("appsv1".to_string().into(), "Deployment".to_string()))
                );
            }
            _ => panic!("expected var decl"),
        }
    }

    #[test]
    fn var_block_parses_multiple_specs() {
        let src = r#"
            var (
                A = corev1.ConfigMap{Name: "a"}
                B = appsv1.Deployment{Name: "b"}
            )
        "#;
        let f = parse(src).unwrap();
        match &f.decls[0] {
            Decl::Var(specs) => assert_eq!(specs.len(), 2),
            _ => panic!("expected var decl"),
        }
    }

    #[test]
    fn skips_func_decls_without_choking() {
        let src = r#"
            func helper() string {
                return "not a resource"
            }
            var X = corev1.ConfigMap{}
        "#;
        let f = parse(src).unwrap();
        assert_eq!(f.decls.len(), 2);
        assert!(matches!(f.decls[0], Decl::Other));
        assert!(matches!(f.decls[1], Decl::Var(_)));
    }
}
