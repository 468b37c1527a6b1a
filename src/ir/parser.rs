//! Parser for the textual module form
//!
//! Line-oriented: one item header or statement per line, `//` comments,
//! blank lines ignored. Builds the module through the arena mutators so use
//! lists come out correct by construction.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

use super::module::{Func, Global, Initializer, Item, Module};
use super::node::{NodeKind, RegionId};
use super::value::{ConstValue, Type, ValueId};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\s+|//.*|%[A-Za-z_][A-Za-z0-9_]*|@[A-Za-z_][A-Za-z0-9_.]*|"(?:[^"\\]|\\.)*"|-?[0-9]+\.[0-9]+|-?[0-9]+|[A-Za-z_][A-Za-z0-9_.]*|->|[{}(),:=]"#,
    )
    .expect("token regex must compile")
});

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// `%name` with the sigil stripped
    Value(String),
    /// `@name` with the sigil stripped
    Symbol(String),
    Str(String),
    Float(f64),
    Int(i64),
    Ident(String),
    Arrow,
    Punct(char),
}

fn tokenize(line: &str, lineno: usize) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    for m in TOKEN_RE.find_iter(line) {
        if m.start() != pos {
            let bad = line[pos..].chars().next().unwrap_or('?');
            return Err(Error::parse(
                lineno,
                format!("unexpected character {:?}", bad),
            ));
        }
        pos = m.end();
        let text = m.as_str();
        if text.trim().is_empty() || text.starts_with("//") {
            continue;
        }
        let token = if text == "->" {
            Token::Arrow
        } else {
            match text.chars().next().unwrap() {
                '%' => Token::Value(text[1..].to_string()),
                '@' => Token::Symbol(text[1..].to_string()),
                '"' => Token::Str(unescape(&text[1..text.len() - 1])),
                '-' | '0'..='9' => {
                    if text.contains('.') {
                        Token::Float(text.parse::<f64>().map_err(|e| {
                            Error::parse(lineno, format!("bad float literal {}: {}", text, e))
                        })?)
                    } else {
                        Token::Int(text.parse::<i64>().map_err(|e| {
                            Error::parse(lineno, format!("bad integer literal {}: {}", text, e))
                        })?)
                    }
                }
                c if c.is_ascii_alphabetic() || c == '_' => Token::Ident(text.to_string()),
                _ => Token::Punct(text.chars().next().unwrap()),
            }
        };
        tokens.push(token);
    }
    if pos != line.len() {
        let bad = line[pos..].chars().next().unwrap_or('?');
        return Err(Error::parse(
            lineno,
            format!("unexpected character {:?}", bad),
        ));
    }
    Ok(tokens)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Cursor over one line's token list
struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    lineno: usize,
}

impl Cursor {
    fn new(tokens: Vec<Token>, lineno: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            lineno,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| Error::parse(self.lineno, "unexpected end of line"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        match self.next()? {
            Token::Punct(p) if p == c => Ok(()),
            other => Err(Error::parse(
                self.lineno,
                format!("expected {:?}, found {:?}", c, other),
            )),
        }
    }

    fn expect_value(&mut self) -> Result<String> {
        match self.next()? {
            Token::Value(name) => Ok(name),
            other => Err(Error::parse(
                self.lineno,
                format!("expected %value, found {:?}", other),
            )),
        }
    }

    fn expect_symbol(&mut self) -> Result<String> {
        match self.next()? {
            Token::Symbol(name) => Ok(name),
            other => Err(Error::parse(
                self.lineno,
                format!("expected @symbol, found {:?}", other),
            )),
        }
    }

    fn expect_type(&mut self) -> Result<Type> {
        match self.next()? {
            Token::Ident(name) => match name.as_str() {
                "i64" => Ok(Type::I64),
                "f64" => Ok(Type::F64),
                "bool" => Ok(Type::Bool),
                "str" => Ok(Type::Str),
                "handle" => Ok(Type::Handle),
                _ => Err(Error::parse(self.lineno, format!("unknown type {}", name))),
            },
            other => Err(Error::parse(
                self.lineno,
                format!("expected type, found {:?}", other),
            )),
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos != self.tokens.len() {
            return Err(Error::parse(
                self.lineno,
                format!("trailing tokens: {:?}", &self.tokens[self.pos..]),
            ));
        }
        Ok(())
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            return true;
        }
        false
    }
}

/// Parse a module from its textual form
pub fn parse_module(source: &str) -> Result<Module> {
    let mut lines = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let tokens = tokenize(raw, i + 1)?;
        if !tokens.is_empty() {
            lines.push((i + 1, tokens));
        }
    }
    Parser {
        module: Module::new(),
        lines,
        pos: 0,
    }
    .parse()
}

struct Parser {
    module: Module,
    lines: Vec<(usize, Vec<Token>)>,
    pos: usize,
}

impl Parser {
    fn parse(mut self) -> Result<Module> {
        let mut cursor = self.next_line()?;
        match (cursor.next()?, cursor.next()?) {
            (Token::Ident(kw), Token::Punct('{')) if kw == "module" => cursor.expect_end()?,
            _ => return Err(Error::parse(cursor.lineno, "expected `module {`")),
        }

        loop {
            let mut cursor = self.next_line()?;
            match cursor.peek() {
                Some(Token::Punct('}')) => {
                    cursor.next()?;
                    cursor.expect_end()?;
                    break;
                }
                Some(Token::Ident(kw)) if kw == "global" => self.parse_global(cursor)?,
                Some(Token::Ident(kw)) if kw == "func" => self.parse_func(cursor)?,
                Some(Token::Ident(kw)) if kw == "initializer" => self.parse_initializer(cursor)?,
                _ => {
                    return Err(Error::parse(
                        cursor.lineno,
                        "expected global, func, initializer, or `}`",
                    ))
                }
            }
        }
        if self.pos != self.lines.len() {
            let (lineno, _) = self.lines[self.pos];
            return Err(Error::parse(lineno, "content after closing `}`"));
        }

        self.validate_global_accesses()?;
        Ok(self.module)
    }

    fn next_line(&mut self) -> Result<Cursor> {
        let (lineno, tokens) = self
            .lines
            .get(self.pos)
            .cloned()
            .ok_or_else(|| Error::parse(self.lines.len() + 1, "unexpected end of input"))?;
        self.pos += 1;
        Ok(Cursor::new(tokens, lineno))
    }

    fn parse_global(&mut self, mut cursor: Cursor) -> Result<()> {
        cursor.next()?; // `global`
        let private = match cursor.peek() {
            Some(Token::Ident(kw)) if kw == "private" => {
                cursor.next()?;
                true
            }
            _ => false,
        };
        let name = cursor.expect_symbol()?;
        cursor.expect_punct(':')?;
        let ty = cursor.expect_type()?;
        cursor.expect_end()?;
        if !self.module.register_symbol(&name) {
            return Err(Error::parse(
                cursor.lineno,
                format!("duplicate symbol @{}", name),
            ));
        }
        self.module
            .items
            .push(Item::Global(Global { name, ty, private }));
        Ok(())
    }

    fn parse_func(&mut self, mut cursor: Cursor) -> Result<()> {
        cursor.next()?; // `func`
        let name = cursor.expect_symbol()?;
        cursor.expect_punct('(')?;
        let mut param_decls = Vec::new();
        if !cursor.eat_punct(')') {
            loop {
                let param = cursor.expect_value()?;
                cursor.expect_punct(':')?;
                let ty = cursor.expect_type()?;
                param_decls.push((param, ty));
                if cursor.eat_punct(')') {
                    break;
                }
                cursor.expect_punct(',')?;
            }
        }
        cursor.expect_punct('{')?;
        cursor.expect_end()?;
        if !self.module.register_symbol(&name) {
            return Err(Error::parse(
                cursor.lineno,
                format!("duplicate symbol @{}", name),
            ));
        }

        let region = self.module.create_region();
        let mut scope = HashMap::new();
        let mut params = Vec::new();
        for (index, (param, ty)) in param_decls.into_iter().enumerate() {
            let value = self.module.alloc_param(ty, index);
            if scope.insert(param.clone(), value).is_some() {
                return Err(Error::parse(
                    cursor.lineno,
                    format!("duplicate parameter %{}", param),
                ));
            }
            params.push(value);
        }
        self.parse_body(region, &mut scope)?;
        self.module.items.push(Item::Func(Func {
            name,
            params,
            region,
        }));
        Ok(())
    }

    fn parse_initializer(&mut self, mut cursor: Cursor) -> Result<()> {
        cursor.next()?; // `initializer`
        cursor.expect_punct('{')?;
        cursor.expect_end()?;
        let region = self.module.create_region();
        let mut scope = HashMap::new();
        self.parse_body(region, &mut scope)?;
        self.module
            .items
            .push(Item::Initializer(Initializer { region }));
        Ok(())
    }

    fn parse_body(&mut self, region: RegionId, scope: &mut HashMap<String, ValueId>) -> Result<()> {
        loop {
            let mut cursor = self.next_line()?;
            if cursor.peek() == Some(&Token::Punct('}')) {
                cursor.next()?;
                cursor.expect_end()?;
                return Ok(());
            }
            self.parse_statement(&mut cursor, region, scope)?;
        }
    }

    fn parse_statement(
        &mut self,
        cursor: &mut Cursor,
        region: RegionId,
        scope: &mut HashMap<String, ValueId>,
    ) -> Result<()> {
        let mut result_names = Vec::new();
        if matches!(cursor.peek(), Some(Token::Value(_))) {
            loop {
                result_names.push(cursor.expect_value()?);
                if cursor.eat_punct('=') {
                    break;
                }
                cursor.expect_punct(',')?;
            }
        }

        let op = match cursor.next()? {
            Token::Ident(op) => op,
            other => {
                return Err(Error::parse(
                    cursor.lineno,
                    format!("expected operation, found {:?}", other),
                ))
            }
        };

        let (kind, operands, result_tys) = match op.as_str() {
            "const" => self.parse_const(cursor)?,
            "add" | "mul" => {
                let lhs = self.resolve(cursor, scope)?;
                cursor.expect_punct(',')?;
                let rhs = self.resolve(cursor, scope)?;
                cursor.expect_punct(':')?;
                let ty = cursor.expect_type()?;
                self.check_numeric(cursor, &op, ty)?;
                self.check_operand_ty(cursor, lhs, ty)?;
                self.check_operand_ty(cursor, rhs, ty)?;
                let kind = if op == "add" { NodeKind::Add } else { NodeKind::Mul };
                (kind, vec![lhs, rhs], vec![ty])
            }
            "neg" => {
                let operand = self.resolve(cursor, scope)?;
                cursor.expect_punct(':')?;
                let ty = cursor.expect_type()?;
                self.check_numeric(cursor, &op, ty)?;
                self.check_operand_ty(cursor, operand, ty)?;
                (NodeKind::Neg, vec![operand], vec![ty])
            }
            "divmod" => {
                let lhs = self.resolve(cursor, scope)?;
                cursor.expect_punct(',')?;
                let rhs = self.resolve(cursor, scope)?;
                cursor.expect_punct(':')?;
                let t0 = cursor.expect_type()?;
                cursor.expect_punct(',')?;
                let t1 = cursor.expect_type()?;
                if t0 != Type::I64 || t1 != Type::I64 {
                    return Err(Error::Type {
                        message: format!("divmod produces i64, i64 (line {})", cursor.lineno),
                    });
                }
                self.check_operand_ty(cursor, lhs, Type::I64)?;
                self.check_operand_ty(cursor, rhs, Type::I64)?;
                (NodeKind::DivMod, vec![lhs, rhs], vec![t0, t1])
            }
            "concat" => {
                let lhs = self.resolve(cursor, scope)?;
                cursor.expect_punct(',')?;
                let rhs = self.resolve(cursor, scope)?;
                cursor.expect_punct(':')?;
                let ty = cursor.expect_type()?;
                if ty != Type::Str {
                    return Err(Error::Type {
                        message: format!("concat produces str (line {})", cursor.lineno),
                    });
                }
                self.check_operand_ty(cursor, lhs, Type::Str)?;
                self.check_operand_ty(cursor, rhs, Type::Str)?;
                (NodeKind::Concat, vec![lhs, rhs], vec![ty])
            }
            "pack" => {
                let mut operands = vec![self.resolve(cursor, scope)?];
                while cursor.eat_punct(',') {
                    operands.push(self.resolve(cursor, scope)?);
                }
                cursor.expect_punct(':')?;
                let ty = cursor.expect_type()?;
                if ty != Type::Handle {
                    return Err(Error::Type {
                        message: format!("pack produces handle (line {})", cursor.lineno),
                    });
                }
                (NodeKind::Pack, operands, vec![ty])
            }
            "call" => {
                let symbol = cursor.expect_symbol()?;
                cursor.expect_punct('(')?;
                let mut operands = Vec::new();
                if !cursor.eat_punct(')') {
                    loop {
                        operands.push(self.resolve(cursor, scope)?);
                        if cursor.eat_punct(')') {
                            break;
                        }
                        cursor.expect_punct(',')?;
                    }
                }
                let mut result_tys = Vec::new();
                if cursor.eat_punct(':') {
                    loop {
                        result_tys.push(cursor.expect_type()?);
                        if !cursor.eat_punct(',') {
                            break;
                        }
                    }
                }
                (NodeKind::Call(symbol), operands, result_tys)
            }
            "load" => {
                let name = cursor.expect_symbol()?;
                cursor.expect_punct(':')?;
                let ty = cursor.expect_type()?;
                (NodeKind::GlobalLoad(name), vec![], vec![ty])
            }
            "store" => {
                let operand = self.resolve(cursor, scope)?;
                match cursor.next()? {
                    Token::Arrow => {}
                    other => {
                        return Err(Error::parse(
                            cursor.lineno,
                            format!("expected ->, found {:?}", other),
                        ))
                    }
                }
                let name = cursor.expect_symbol()?;
                (NodeKind::GlobalStore(name), vec![operand], vec![])
            }
            "return" => {
                let mut operands = Vec::new();
                if matches!(cursor.peek(), Some(Token::Value(_))) {
                    loop {
                        operands.push(self.resolve(cursor, scope)?);
                        if !cursor.eat_punct(',') {
                            break;
                        }
                    }
                }
                (NodeKind::Return, operands, vec![])
            }
            _ => {
                return Err(Error::parse(
                    cursor.lineno,
                    format!("unknown operation {}", op),
                ))
            }
        };
        cursor.expect_end()?;

        if result_names.len() != result_tys.len() {
            return Err(Error::parse(
                cursor.lineno,
                format!(
                    "{} produces {} result(s), {} bound",
                    op,
                    result_tys.len(),
                    result_names.len()
                ),
            ));
        }

        let node = self.module.append_node(region, kind, operands, result_tys);
        let results = self.module.node(node).results.clone();
        for (name, value) in result_names.into_iter().zip(results) {
            if scope.insert(name.clone(), value).is_some() {
                return Err(Error::parse(
                    cursor.lineno,
                    format!("redefinition of %{}", name),
                ));
            }
        }
        Ok(())
    }

    fn parse_const(&mut self, cursor: &mut Cursor) -> Result<(NodeKind, Vec<ValueId>, Vec<Type>)> {
        let literal = cursor.next()?;
        cursor.expect_punct(':')?;
        let ty = cursor.expect_type()?;
        let value = match (&literal, ty) {
            (Token::Int(v), Type::I64) => ConstValue::I64(*v),
            (Token::Int(v), Type::F64) => ConstValue::F64(*v as f64),
            (Token::Float(v), Type::F64) => ConstValue::F64(*v),
            (Token::Str(v), Type::Str) => ConstValue::Str(v.clone()),
            (Token::Ident(v), Type::Bool) if v == "true" => ConstValue::Bool(true),
            (Token::Ident(v), Type::Bool) if v == "false" => ConstValue::Bool(false),
            _ => {
                return Err(Error::Type {
                    message: format!(
                        "literal {:?} does not match type {} (line {})",
                        literal, ty, cursor.lineno
                    ),
                })
            }
        };
        Ok((NodeKind::Const(value), vec![], vec![ty]))
    }

    fn resolve(&self, cursor: &mut Cursor, scope: &HashMap<String, ValueId>) -> Result<ValueId> {
        let name = cursor.expect_value()?;
        scope.get(&name).copied().ok_or_else(|| {
            Error::parse(cursor.lineno, format!("use of undefined value %{}", name))
        })
    }

    fn check_numeric(&self, cursor: &Cursor, op: &str, ty: Type) -> Result<()> {
        if !matches!(ty, Type::I64 | Type::F64) {
            return Err(Error::Type {
                message: format!("{} requires a numeric type (line {})", op, cursor.lineno),
            });
        }
        Ok(())
    }

    fn check_operand_ty(&self, cursor: &Cursor, operand: ValueId, expected: Type) -> Result<()> {
        let actual = self.module.value(operand).ty;
        if actual != expected {
            return Err(Error::Type {
                message: format!(
                    "operand has type {}, expected {} (line {})",
                    actual, expected, cursor.lineno
                ),
            });
        }
        Ok(())
    }

    /// Check that every load/store names a declared global of matching type
    fn validate_global_accesses(&self) -> Result<()> {
        for (_, node) in self.module.iter_nodes() {
            match &node.kind {
                NodeKind::GlobalLoad(name) => {
                    let global = self
                        .module
                        .find_global(name)
                        .ok_or_else(|| Error::UnknownSymbol { name: name.clone() })?;
                    let ty = self.module.value(node.results[0]).ty;
                    if ty != global.ty {
                        return Err(Error::Type {
                            message: format!(
                                "load of @{} has type {}, global is {}",
                                name, ty, global.ty
                            ),
                        });
                    }
                }
                NodeKind::GlobalStore(name) => {
                    let global = self
                        .module
                        .find_global(name)
                        .ok_or_else(|| Error::UnknownSymbol { name: name.clone() })?;
                    let ty = self.module.value(node.operands[0]).ty;
                    if ty != global.ty {
                        return Err(Error::Type {
                            message: format!(
                                "store to @{} has type {}, global is {}",
                                name, ty, global.ty
                            ),
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
