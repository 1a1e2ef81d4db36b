//! Field recognisers.
//!
//! The device payload is close enough to JSON to look like it, but not close
//! enough to parse as it. Instead of a document parser, each field is found by
//! its quoted key and only the value that follows is parsed. A recogniser
//! that cannot read its value reports the field as absent; it never fails the
//! whole payload.

use nom::{
    bytes::complete::take_while,
    character::complete::{char, digit1, multispace0},
    combinator::{map_res, opt, recognize},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use super::record::Group;

/// Allowed layout for a grouped field: how many inner groups, and how many
/// integers in each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    pub min_groups: usize,
    pub max_groups: usize,
    pub min_width: usize,
    pub max_width: usize,
}

impl Shape {
    pub const fn exact(groups: usize, width: usize) -> Self {
        Self::between(groups, groups, width)
    }

    pub const fn between(min_groups: usize, max_groups: usize, width: usize) -> Self {
        Self {
            min_groups,
            max_groups,
            min_width: width,
            max_width: width,
        }
    }

    /// Per-channel layout used by inverters: `[[a], [b], [c]]`, or a single
    /// row whose length varies with the model.
    pub const fn ragged(
        min_groups: usize,
        max_groups: usize,
        min_width: usize,
        max_width: usize,
    ) -> Self {
        Self {
            min_groups,
            max_groups,
            min_width,
            max_width,
        }
    }

    pub fn accepts(&self, groups: &[Group]) -> bool {
        (self.min_groups..=self.max_groups).contains(&groups.len())
            && groups
                .iter()
                .all(|g| (self.min_width..=self.max_width).contains(&g.len()))
    }
}

pub fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c: char| c != '"'), char('"'))(input)
}

fn separator(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

/// `[1, 2, 3]`
pub fn group(input: &str) -> IResult<&str, Group> {
    delimited(
        pair(char('['), multispace0),
        separated_list1(separator, integer),
        pair(multispace0, char(']')),
    )(input)
}

/// `[[1, 2], [3, 4]]`
pub fn groups(input: &str) -> IResult<&str, Vec<Group>> {
    delimited(
        pair(char('['), multispace0),
        separated_list1(separator, group),
        pair(multispace0, char(']')),
    )(input)
}

/// Opening `[[` followed by the permissive cell body, up to the first `]`.
fn cell_body(input: &str) -> IResult<&str, &str> {
    delimited(
        tuple((char('['), multispace0, char('['))),
        take_while(|c: char| {
            c.is_ascii_digit() || c == ',' || c == '-' || c.is_whitespace()
        }),
        char(']'),
    )(input)
}

/// Everything after `"key"` and its colon, for the first occurrence of the
/// key that is actually followed by one.
pub fn value_of<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let anchor = format!("\"{}\"", key);

    text.match_indices(anchor.as_str()).find_map(|(at, _)| {
        let rest = &text[at + anchor.len()..];
        let colon: IResult<&str, _> = tuple((multispace0, char(':'), multispace0))(rest);
        colon.ok().map(|(value, _)| value)
    })
}

pub fn int_field(text: &str, key: &str) -> Option<i64> {
    let value = value_of(text, key)?;
    integer(value).ok().map(|(_, n)| n)
}

pub fn text_field(text: &str, key: &str) -> Option<String> {
    let value = value_of(text, key)?;
    quoted(value).ok().map(|(_, s)| s.to_string())
}

pub fn group_field(text: &str, key: &str, shape: Shape) -> Option<Vec<Group>> {
    group_field_any(text, key, &[shape])
}

/// Like [`group_field`], for keys whose layout differs between device types.
pub fn group_field_any(text: &str, key: &str, shapes: &[Shape]) -> Option<Vec<Group>> {
    let value = value_of(text, key)?;
    let (_, parsed) = groups(value).ok()?;
    shapes.iter().any(|s| s.accepts(&parsed)).then_some(parsed)
}

/// `BTemp` if it is readable, otherwise the first group of `BtemList` when
/// that group holds exactly two readings.
pub fn temperature_field(text: &str) -> Option<Vec<Group>> {
    group_field(text, "BTemp", Shape::between(1, 2, 2)).or_else(|| {
        let value = value_of(text, "BtemList")?;
        let (_, first) = preceded(pair(char('['), multispace0), group)(value).ok()?;
        (first.len() == 2).then(|| vec![first])
    })
}

/// Flat integer list inside one level of nesting, e.g. `[[3301,3302]]`.
pub fn cell_list_field(text: &str, key: &str) -> Option<Vec<i64>> {
    let value = value_of(text, key)?;
    let (_, body) = cell_body(value).ok()?;

    body.split(',')
        .map(|n| n.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()
}
