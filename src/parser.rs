//! `CREATE TABLE` parser using nom.
//!
//! Parses a single table definition into a [`Schema`].
//!
//! # Accepted shape
//!
//! ```text
//! CREATE TABLE [IF NOT EXISTS] produtos ( id INT PRIMARY KEY AUTO_INCREMENT, ... ) ENGINE=InnoDB;
//! ─────┬────── ───────┬─────── ───┬──── ─────────────────┬──────────────────────── ──────┬────────
//!      │              │           │                      │                              │
//!      │              │           │                      │                              └── Table options (ignored)
//!      │              │           │                      └── Column definitions / table constraints
//!      │              │           └── Table name (`quoted`, "quoted", [quoted] or bare)
//!      │              └── Optional guard
//!      └── Statement
//! ```
//!
//! The grammar produces raw definitions; [`resolve`] then maps type tokens
//! through the alias table and checks the schema invariants.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, digit1, multispace1, not_line_ending},
    combinator::{consumed, map, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use tracing::debug;

use crate::error::{ParseError, ParseResult};
use crate::schema::{Column, DefaultValue, LogicalType, Schema};
use crate::typemap;
use crate::value::parse_bool_token;

/// Parse DDL text containing one `CREATE TABLE` statement.
pub fn parse(input: &str) -> ParseResult<Schema> {
    check_balanced(input)?;

    let (rest, table_name) = create_table_header(input)
        .map_err(|_| ParseError::malformed(0, "expected a CREATE TABLE statement"))?;

    match table_body(rest) {
        Ok(("", entries)) => {
            let raw = RawTable {
                name: table_name,
                entries,
            };
            let schema = resolve(raw, input.len())?;
            debug!(
                table = schema.table_name(),
                columns = schema.len(),
                "parsed CREATE TABLE"
            );
            Ok(schema)
        }
        Ok((remaining, _)) => Err(ParseError::malformed(
            input.len() - remaining.len(),
            format!("unexpected content after statement: '{}'", snippet(remaining)),
        )),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(ParseError::malformed(
            input.len() - e.input.len(),
            format!("unexpected input near '{}'", snippet(e.input)),
        )),
        Err(nom::Err::Incomplete(_)) => {
            Err(ParseError::malformed(input.len(), "unexpected end of input"))
        }
    }
}

// =============================================================================
// Raw definitions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct RawTable {
    name: String,
    entries: Vec<RawEntry>,
}

#[derive(Debug, Clone, PartialEq)]
enum RawEntry {
    Column(RawColumn),
    /// Table-level `PRIMARY KEY (a, b)`.
    PrimaryKey(Vec<String>),
    /// Indexes, foreign keys and other table constraints.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
struct RawColumn {
    name: String,
    type_name: String,
    args: Vec<String>,
    constraints: Vec<RawConstraint>,
    /// Remaining input length where the definition starts.
    rest_len: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum RawConstraint {
    PrimaryKey,
    NotNull,
    Null,
    AutoIncrement,
    Unique,
    /// Parsed value plus the text as written.
    Default(DefaultValue, String),
    Check(String),
    Ignored,
}

// =============================================================================
// Parsing Combinators
// =============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Skip whitespace and comments.
fn sp(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("--"), not_line_ending)),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(input)
}

/// Case-insensitive keyword that is not the prefix of a longer word.
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, matched) = nom::bytes::complete::tag_no_case(kw)(input)?;
        if rest.chars().next().is_some_and(is_ident_char) {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Tag)));
        }
        Ok((rest, matched))
    }
}

fn bare_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(is_ident_char)(input)
}

/// Identifier, bare or quoted with backticks, double quotes or brackets.
fn identifier(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('`'), take_while1(|c| c != '`'), char('`')),
            delimited(char('"'), take_while1(|c| c != '"'), char('"')),
            delimited(char('['), take_while1(|c| c != ']'), char(']')),
            bare_identifier,
        )),
        String::from,
    )(input)
}

/// `schema.table` keeps the last segment.
fn qualified_name(input: &str) -> IResult<&str, String> {
    let (input, first) = identifier(input)?;
    let (input, rest) = many0(preceded(tuple((sp, char('.'), sp)), identifier))(input)?;
    Ok((input, rest.into_iter().last().unwrap_or(first)))
}

/// Single-quoted string with `''` escapes; an `N` prefix is accepted.
fn string_literal(input: &str) -> IResult<&str, String> {
    let (input, _) = opt(alt((char('N'), char('n'))))(input)?;
    let (mut rest, _) = char('\'')(input)?;
    let mut out = String::new();
    loop {
        let Some(i) = rest.find('\'') else {
            return Err(nom::Err::Error(Error::new(rest, ErrorKind::Char)));
        };
        out.push_str(&rest[..i]);
        rest = &rest[i + 1..];
        if let Some(after) = rest.strip_prefix('\'') {
            out.push('\'');
            rest = after;
        } else {
            return Ok((rest, out));
        }
    }
}

fn number_literal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(alt((char('-'), char('+')))),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)
}

/// Balanced `( ... )`, returning the inner text.
fn paren_group(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&body[i + 1..], &body[..i]));
                }
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

/// Consume the rest of a table entry up to its terminating `,` or `)`.
fn skip_entry(input: &str) -> IResult<&str, &str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') if depth == 0 => return Ok((&input[i..], &input[..i])),
            (None, ')') => depth -= 1,
            (None, ',') if depth == 0 => return Ok((&input[i..], &input[..i])),
            _ => {}
        }
    }
    Err(nom::Err::Error(Error::new(input, ErrorKind::TakeUntil)))
}

/// `CREATE [TEMPORARY] TABLE [IF NOT EXISTS] name`
fn create_table_header(input: &str) -> IResult<&str, String> {
    let (input, _) = sp(input)?;
    let (input, _) = keyword("CREATE")(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = opt(terminated(alt((keyword("TEMPORARY"), keyword("TEMP"))), sp))(input)?;
    let (input, _) = keyword("TABLE")(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = opt(tuple((
        keyword("IF"),
        sp,
        keyword("NOT"),
        sp,
        keyword("EXISTS"),
        sp,
    )))(input)?;
    qualified_name(input)
}

/// `( entries ) [table options] [;]`
fn table_body(input: &str) -> IResult<&str, Vec<RawEntry>> {
    let (input, _) = sp(input)?;
    let (input, _) = char('(')(input)?;
    let (input, _) = sp(input)?;
    let (input, entries) = separated_list0(tuple((sp, char(','), sp)), table_entry)(input)?;
    let (input, _) = sp(input)?;
    let (input, _) = char(')')(input)?;
    // MySQL table options: ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 ...
    let (input, _) = nom::bytes::complete::take_till(|c| c == ';')(input)?;
    let (input, _) = opt(char(';'))(input)?;
    let (input, _) = sp(input)?;
    Ok((input, entries))
}

/// A column whose name is a constraint word (`key`, `check`, `index`) still
/// parses as a column when a known type follows and the entry ends there.
fn table_entry(input: &str) -> IResult<&str, RawEntry> {
    if let Ok((rest, column)) = column_def(input) {
        if typemap::lookup(&column.type_name).is_some() && at_entry_end(rest) {
            return Ok((rest, RawEntry::Column(column)));
        }
    }
    alt((table_constraint, map(column_def, RawEntry::Column)))(input)
}

fn at_entry_end(input: &str) -> bool {
    matches!(sp(input), Ok((rest, _)) if rest.starts_with([',', ')']))
}

fn constraint_name(input: &str) -> IResult<&str, ()> {
    value((), tuple((keyword("CONSTRAINT"), sp, identifier, sp)))(input)
}

fn table_constraint(input: &str) -> IResult<&str, RawEntry> {
    alt((
        map(
            preceded(
                tuple((
                    opt(constraint_name),
                    keyword("PRIMARY"),
                    sp,
                    keyword("KEY"),
                    sp,
                    opt(terminated(
                        alt((keyword("CLUSTERED"), keyword("NONCLUSTERED"))),
                        sp,
                    )),
                )),
                paren_group,
            ),
            |cols| RawEntry::PrimaryKey(key_columns(cols)),
        ),
        value(
            RawEntry::Skipped,
            tuple((
                opt(constraint_name),
                alt((
                    keyword("UNIQUE"),
                    keyword("KEY"),
                    keyword("INDEX"),
                    keyword("FULLTEXT"),
                    keyword("SPATIAL"),
                    keyword("FOREIGN"),
                    keyword("CHECK"),
                )),
                skip_entry,
            )),
        ),
    ))(input)
}

/// Column names inside a key list: quotes, sort order and prefix lengths dropped.
fn key_columns(list: &str) -> Vec<String> {
    list.split(',')
        .filter_map(|part| identifier(part.trim()).ok().map(|(_, name)| name))
        .collect()
}

fn type_arg(input: &str) -> IResult<&str, String> {
    alt((
        string_literal,
        map(number_literal, String::from),
        map(bare_identifier, String::from),
    ))(input)
}

fn type_args(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        pair(char('('), sp),
        separated_list0(tuple((sp, char(','), sp)), type_arg),
        pair(sp, char(')')),
    )(input)
}

/// `name TYPE[(args)] [constraints...]`
fn column_def(input: &str) -> IResult<&str, RawColumn> {
    let rest_len = input.len();
    let (input, name) = identifier(input)?;
    let (input, _) = sp(input)?;
    let (input, type_name) = bare_identifier(input)?;
    // DOUBLE PRECISION, CHARACTER VARYING
    let (input, _) = opt(preceded(sp, alt((keyword("PRECISION"), keyword("VARYING")))))(input)?;
    let (input, args) = opt(preceded(sp, type_args))(input)?;
    // TIMESTAMP WITH[OUT] TIME ZONE
    let (input, _) = opt(preceded(
        sp,
        tuple((
            alt((keyword("WITHOUT"), keyword("WITH"))),
            sp,
            keyword("TIME"),
            sp,
            keyword("ZONE"),
        )),
    ))(input)?;
    let (input, constraints) = many0(preceded(sp, column_constraint))(input)?;

    Ok((
        input,
        RawColumn {
            name,
            type_name: type_name.to_string(),
            args: args.unwrap_or_default(),
            constraints,
            rest_len,
        },
    ))
}

fn referential_action(input: &str) -> IResult<&str, ()> {
    alt((
        value(
            (),
            tuple((keyword("SET"), sp, alt((keyword("NULL"), keyword("DEFAULT"))))),
        ),
        value((), tuple((keyword("NO"), sp, keyword("ACTION")))),
        value((), keyword("CASCADE")),
        value((), keyword("RESTRICT")),
        value((), default_expr),
    ))(input)
}

fn column_constraint(input: &str) -> IResult<&str, RawConstraint> {
    alt((
        value(
            RawConstraint::PrimaryKey,
            tuple((
                keyword("PRIMARY"),
                sp,
                keyword("KEY"),
                opt(preceded(
                    sp,
                    alt((
                        keyword("ASC"),
                        keyword("DESC"),
                        keyword("CLUSTERED"),
                        keyword("NONCLUSTERED"),
                    )),
                )),
            )),
        ),
        value(
            RawConstraint::NotNull,
            tuple((keyword("NOT"), sp, keyword("NULL"))),
        ),
        value(RawConstraint::Null, keyword("NULL")),
        value(
            RawConstraint::AutoIncrement,
            alt((keyword("AUTO_INCREMENT"), keyword("AUTOINCREMENT"))),
        ),
        value(
            RawConstraint::AutoIncrement,
            pair(keyword("IDENTITY"), opt(preceded(sp, paren_group))),
        ),
        value(
            RawConstraint::Unique,
            pair(keyword("UNIQUE"), opt(preceded(sp, keyword("KEY")))),
        ),
        map(
            preceded(pair(keyword("DEFAULT"), sp), consumed(default_expr)),
            |(text, value)| RawConstraint::Default(value, text.to_string()),
        ),
        map(preceded(pair(keyword("CHECK"), sp), paren_group), |expr| {
            RawConstraint::Check(expr.to_string())
        }),
        value(
            RawConstraint::Ignored,
            alt((
                keyword("UNSIGNED"),
                keyword("SIGNED"),
                keyword("ZEROFILL"),
            )),
        ),
        value(
            RawConstraint::Ignored,
            tuple((
                keyword("CHARACTER"),
                sp,
                keyword("SET"),
                sp,
                opt(pair(char('='), sp)),
                identifier,
            )),
        ),
        value(
            RawConstraint::Ignored,
            tuple((
                alt((keyword("CHARSET"), keyword("COLLATE"))),
                sp,
                opt(pair(char('='), sp)),
                identifier,
            )),
        ),
        value(
            RawConstraint::Ignored,
            tuple((keyword("COMMENT"), sp, string_literal)),
        ),
        value(
            RawConstraint::Ignored,
            tuple((
                keyword("ON"),
                sp,
                alt((keyword("UPDATE"), keyword("DELETE"))),
                sp,
                referential_action,
            )),
        ),
        value(
            RawConstraint::Ignored,
            tuple((
                keyword("REFERENCES"),
                sp,
                qualified_name,
                opt(preceded(sp, paren_group)),
            )),
        ),
        value(RawConstraint::Ignored, constraint_name),
    ))(input)
}

/// Default value: string, number, parenthesized expression or keyword/function.
fn default_expr(input: &str) -> IResult<&str, DefaultValue> {
    alt((
        map(string_literal, DefaultValue::Text),
        map(number_literal, |n| DefaultValue::Number(n.to_string())),
        map(paren_group, classify_parenthesized),
        map(
            recognize(pair(bare_identifier, opt(preceded(sp, paren_group)))),
            classify_word,
        ),
    ))(input)
}

/// SQL Server wraps defaults in parentheses: `DEFAULT ((0))`, `DEFAULT (getdate())`.
fn classify_parenthesized(inner: &str) -> DefaultValue {
    let inner = inner.trim();
    match terminated(default_expr, sp)(inner) {
        Ok(("", value)) => value,
        _ => DefaultValue::Expression(format!("({})", inner)),
    }
}

fn classify_word(word: &str) -> DefaultValue {
    let compact: String = word
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    match compact.as_str() {
        "NULL" => DefaultValue::Null,
        "TRUE" => DefaultValue::Boolean(true),
        "FALSE" => DefaultValue::Boolean(false),
        "CURRENT_TIMESTAMP" | "LOCALTIMESTAMP" | "NOW()" | "GETDATE()" | "GETUTCDATE()"
        | "SYSDATETIME()" | "SYSUTCDATETIME()" | "DATETIME('NOW')"
        | "DATETIME('NOW','LOCALTIME')" => DefaultValue::CurrentTimestamp,
        c if c.starts_with("CURRENT_TIMESTAMP(") || c.starts_with("NOW(") => {
            DefaultValue::CurrentTimestamp
        }
        _ => DefaultValue::Expression(word.trim().to_string()),
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Turn raw definitions into a checked [`Schema`].
fn resolve(raw: RawTable, total_len: usize) -> ParseResult<Schema> {
    let mut columns = Vec::new();
    let mut inline_pk: Option<String> = None;
    let mut table_pk: Option<Vec<String>> = None;

    for entry in raw.entries {
        match entry {
            RawEntry::Column(col) => {
                columns.push(resolve_column(col, total_len, &mut inline_pk)?);
            }
            RawEntry::PrimaryKey(cols) => {
                if table_pk.is_some() {
                    return Err(ParseError::DuplicatePrimaryKey(cols.join(", ")));
                }
                table_pk = Some(cols);
            }
            RawEntry::Skipped => {}
        }
    }

    if columns.is_empty() {
        return Err(ParseError::malformed(0, "empty column list"));
    }

    if let Some(pk_cols) = table_pk {
        if let Some(name) = inline_pk {
            return Err(ParseError::DuplicatePrimaryKey(name));
        }
        if pk_cols.is_empty() {
            return Err(ParseError::malformed(0, "empty PRIMARY KEY column list"));
        }
        for name in pk_cols {
            let col = columns
                .iter_mut()
                .find(|c: &&mut Column| c.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| {
                    ParseError::malformed(
                        0,
                        format!("PRIMARY KEY references unknown column '{}'", name),
                    )
                })?;
            col.is_primary_key = true;
            col.nullable = false;
        }
    }

    Schema::new(raw.name, columns)
}

fn resolve_column(
    raw: RawColumn,
    total_len: usize,
    inline_pk: &mut Option<String>,
) -> ParseResult<Column> {
    let position = total_len - raw.rest_len;
    let resolved = typemap::resolve(&raw.type_name, &raw.args, position)?;

    let mut column = Column::new(raw.name, resolved.logical_type);
    column.is_auto_increment = resolved.auto_increment;
    let mut checks = Vec::new();
    let mut default_text: Option<String> = None;

    for constraint in raw.constraints {
        match constraint {
            RawConstraint::PrimaryKey => {
                if inline_pk.is_some() {
                    return Err(ParseError::DuplicatePrimaryKey(column.name));
                }
                *inline_pk = Some(column.name.clone());
                column.is_primary_key = true;
            }
            RawConstraint::NotNull => column.nullable = false,
            RawConstraint::Null => column.nullable = true,
            RawConstraint::AutoIncrement => column.is_auto_increment = true,
            RawConstraint::Unique => column.is_unique = true,
            RawConstraint::Default(v, text) => {
                column.default = Some(v);
                default_text = Some(text);
            }
            RawConstraint::Check(expr) => checks.push(expr),
            RawConstraint::Ignored => {}
        }
    }

    if column.is_primary_key {
        column.nullable = false;
    }

    // SQLite spells booleans as INTEGER CHECK (col IN (0, 1))
    if column.logical_type == LogicalType::Integer
        && checks.iter().any(|c| is_boolean_check(c, &column.name))
    {
        column.logical_type = LogicalType::Boolean;
    }

    // SQLite stores dates as TEXT DEFAULT (datetime('now'))
    if resolved.date_capable_text && default_text.as_deref().is_some_and(is_sqlite_clock) {
        column.logical_type = LogicalType::Timestamp;
    }

    if column.logical_type == LogicalType::Boolean {
        column.default = column.default.map(boolean_default);
    }

    Ok(column)
}

fn is_boolean_check(expr: &str, column: &str) -> bool {
    let compact: String = expr
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '"' | '`' | '[' | ']'))
        .collect::<String>()
        .to_lowercase();
    let name = column.to_lowercase();
    compact == format!("{}in(0,1)", name) || compact == format!("{}in(1,0)", name)
}

fn is_sqlite_clock(expr: &str) -> bool {
    let compact: String = expr
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    compact.trim_start_matches('(').starts_with("datetime('now'")
}

fn boolean_default(default: DefaultValue) -> DefaultValue {
    let token = match &default {
        DefaultValue::Number(n) | DefaultValue::Text(n) => parse_bool_token(n),
        _ => None,
    };
    token.map_or(default, DefaultValue::Boolean)
}

/// Reject unbalanced parentheses up front, ignoring quotes and comments.
fn check_balanced(input: &str) -> ParseResult<()> {
    let mut depth: i64 = 0;
    let mut quote: Option<char> = None;
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '-' if chars.peek().map(|(_, n)| *n) == Some('-') => {
                for (_, n) in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek().map(|(_, n)| *n) == Some('*') => {
                chars.next();
                let mut prev = ' ';
                for (_, n) in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::malformed(i, "unbalanced parentheses"));
                }
            }
            _ => {}
        }
    }

    if depth != 0 || quote.is_some() {
        let reason = if quote.is_some() {
            "unterminated quote"
        } else {
            "unbalanced parentheses"
        };
        return Err(ParseError::malformed(input.len(), reason));
    }
    Ok(())
}

fn snippet(s: &str) -> String {
    let line = s.trim_start().lines().next().unwrap_or("");
    line.chars().take(30).collect()
}
