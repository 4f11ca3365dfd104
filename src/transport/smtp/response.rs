//! SMTP replies: a mandatory three digit code and zero or more text lines

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use nom::{
    bytes::streaming::{tag, take_until},
    character::streaming::{one_of, satisfy},
    combinator::{map_opt, opt},
    multi::many0,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::transport::smtp::{error, Error};

/// The first digit of a reply code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// 2yz
    PositiveCompletion = 2,
    /// 3yz
    PositiveIntermediate = 3,
    /// 4yz
    TransientNegativeCompletion = 4,
    /// 5yz
    PermanentNegativeCompletion = 5,
}

impl Severity {
    fn from_digit(digit: char) -> Option<Severity> {
        match digit {
            '2' => Some(Severity::PositiveCompletion),
            '3' => Some(Severity::PositiveIntermediate),
            '4' => Some(Severity::TransientNegativeCompletion),
            '5' => Some(Severity::PermanentNegativeCompletion),
            _ => None,
        }
    }
}

/// The second digit of a reply code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// x0z
    Syntax = 0,
    /// x1z
    Information = 1,
    /// x2z
    Connections = 2,
    /// x3z
    Unspecified3 = 3,
    /// x4z
    Unspecified4 = 4,
    /// x5z
    MailSystem = 5,
}

impl Category {
    fn from_digit(digit: char) -> Option<Category> {
        match digit {
            '0' => Some(Category::Syntax),
            '1' => Some(Category::Information),
            '2' => Some(Category::Connections),
            '3' => Some(Category::Unspecified3),
            '4' => Some(Category::Unspecified4),
            '5' => Some(Category::MailSystem),
            _ => None,
        }
    }
}

/// A three digit SMTP reply code
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Code {
    /// First digit of the reply code
    pub severity: Severity,
    /// Second digit of the reply code
    pub category: Category,
    /// Third digit, `0..=9`
    pub detail: u8,
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.severity as u8, self.category as u8, self.detail
        )
    }
}

impl Code {
    /// Creates a new `Code`
    pub fn new(severity: Severity, category: Category, detail: u8) -> Code {
        Code {
            severity,
            category,
            detail: detail % 10,
        }
    }

    /// Tells if the reply is positive
    pub fn is_positive(self) -> bool {
        matches!(
            self.severity,
            Severity::PositiveCompletion | Severity::PositiveIntermediate
        )
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        100 * code.severity as u16 + 10 * code.category as u16 + code.detail as u16
    }
}

/// An SMTP reply, with separated code and text lines
#[derive(PartialEq, Eq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
    code: Code,
    /// One entry per reply line, the code and separator stripped
    message: Vec<String>,
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> Result<Response, Error> {
        parse_response(s)
            .map(|(_, r)| r)
            .map_err(|e| error::response(e.to_string()))
    }
}

impl Response {
    /// Creates a new `Response`
    pub fn new(code: Code, message: Vec<String>) -> Response {
        Response { code, message }
    }

    /// Tells if the reply is positive
    pub fn is_positive(&self) -> bool {
        self.code.is_positive()
    }

    /// Compares the reply code with a numeric one, e.g. `334`
    pub fn has_code(&self, code: u16) -> bool {
        u16::from(self.code) == code
    }

    /// First word of the first line, usually the server name in greetings
    pub fn first_word(&self) -> Option<&str> {
        self.message
            .first()
            .and_then(|line| line.split_whitespace().next())
    }

    /// First line of the reply text
    pub fn first_line(&self) -> Option<&str> {
        self.message.first().map(String::as_str)
    }

    /// Reply code
    pub fn code(&self) -> Code {
        self.code
    }

    /// Reply text, one item per line
    pub fn message(&self) -> impl Iterator<Item = &str> {
        self.message.iter().map(String::as_str)
    }
}

fn parse_code(i: &str) -> IResult<&str, Code> {
    map_opt(
        tuple((
            one_of("2345"),
            one_of("012345"),
            satisfy(|c| c.is_ascii_digit()),
        )),
        |(severity, category, detail)| {
            Some(Code {
                severity: Severity::from_digit(severity)?,
                category: Category::from_digit(category)?,
                detail: detail.to_digit(10)? as u8,
            })
        },
    )(i)
}

/// Parses one complete reply, returning `Incomplete` while lines are missing
pub(crate) fn parse_response(i: &str) -> IResult<&str, Response> {
    let (i, lines) = many0(tuple((
        parse_code,
        terminated(preceded(tag("-"), take_until("\r\n")), tag("\r\n")),
    )))(i)?;
    let (i, (last_code, last_line)) = terminated(
        tuple((parse_code, opt(preceded(tag(" "), take_until("\r\n"))))),
        tag("\r\n"),
    )(i)?;

    if lines.iter().any(|&(code, _)| code != last_code) {
        return Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Verify,
        )));
    }

    let mut message: Vec<String> = lines.into_iter().map(|(_, text)| text.into()).collect();
    message.push(last_line.unwrap_or_default().into());

    Ok((
        i,
        Response {
            code: last_code,
            message,
        },
    ))
}
