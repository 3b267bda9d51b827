//! 行式文本项目格式。
//!
//! 首行为 `#VERSION=<n>`，其后每行一个对象：
//! - 建筑：`<类名> <x> <y> <旋转角>`
//! - 路径：`<类名> <起点x> <起点y> <终点x> <终点y>`
//! - 文本框（版本 1 起）：`#TEXTBOX <x> <y> <宽> <高> <转义后的内容>`
//!
//! 类名可以包含空格，取能匹配定义表的最长前缀词组，路径定义优先。

use std::fmt::{self, Write as _};
use std::num::{ParseFloatError, ParseIntError};

use blueprint_core::catalog::Catalog;
use blueprint_core::geometry::{Point2, Rect};
use blueprint_core::objects::{Building, ObjectCollection, Path, TextBox};
use thiserror::Error;
use tracing::{debug, trace};

/// 写出时使用的版本号，也是可读取的最高版本。
pub const SUPPORTED_VERSION: i64 = 1;

const VERSION_TAG: &str = "#VERSION=";
const TEXT_BOX_TAG: &str = "#TEXTBOX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    EmptyFile,
    InvalidVersionLine,
    InvalidVersionNumber,
    VersionTooHigh,
    InvalidPathLine,
    InvalidBuildingLine,
    InvalidTextBoxLine,
    UnknownClass(String),
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFile => f.write_str("empty file"),
            Self::InvalidVersionLine => f.write_str("invalid first line, expected '#VERSION=x'"),
            Self::InvalidVersionNumber => {
                f.write_str("invalid version, expected a non-negative integer")
            }
            Self::VersionTooHigh => f.write_str("version is too high"),
            Self::InvalidPathLine => {
                f.write_str("invalid path line, expected '[class] [startX] [startY] [endX] [endY]'")
            }
            Self::InvalidBuildingLine => {
                f.write_str("invalid building line, expected '[class] [posX] [posY] [rotation]'")
            }
            Self::InvalidTextBoxLine => {
                f.write_str("invalid text box line, expected '#TEXTBOX [x] [y] [w] [h] [text]'")
            }
            Self::UnknownClass(class) => write!(f, "unknown class `{class}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    #[error(transparent)]
    Float(#[from] ParseFloatError),
    #[error(transparent)]
    Int(#[from] ParseIntError),
}

/// 结构化的解析错误：错误类别、物理行号（从 1 开始）、已解析的版本与底层数值错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub line: usize,
    pub version: Option<i64>,
    #[source]
    pub source: Option<NumberError>,
}

impl DecodeError {
    fn new(kind: DecodeErrorKind, line: usize, version: Option<i64>) -> Self {
        Self {
            kind,
            line,
            version,
            source: None,
        }
    }

    fn with_source(mut self, source: impl Into<NumberError>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// 解析整份文本。任何错误都不会产生部分结果。
pub fn decode(text: &str, catalog: &Catalog) -> Result<ObjectCollection, DecodeError> {
    let mut lines = text.lines().map(|line| line.trim_end_matches('\r'));
    let first = lines.next().unwrap_or_default();
    if first.is_empty() {
        return Err(DecodeError::new(DecodeErrorKind::EmptyFile, 1, None));
    }
    let version = parse_version(first)?;
    debug!(version, "读取项目文件");

    let mut objects = ObjectCollection::new();
    let ctx = LineContext { catalog, version };
    for (idx, line) in lines.enumerate() {
        // 第一行是版本行
        let no = idx + 2;
        if line.trim().is_empty() {
            continue;
        }
        ctx.decode_line(line, no, &mut objects)?;
    }
    Ok(objects)
}

fn parse_version(line: &str) -> Result<i64, DecodeError> {
    let invalid_line = || DecodeError::new(DecodeErrorKind::InvalidVersionLine, 1, None);
    let raw = line.strip_prefix(VERSION_TAG).ok_or_else(invalid_line)?;
    let version: i64 = raw
        .trim()
        .parse()
        .map_err(|err: ParseIntError| invalid_line().with_source(err))?;
    if version < 0 {
        return Err(DecodeError::new(
            DecodeErrorKind::InvalidVersionNumber,
            1,
            Some(version),
        ));
    }
    if version > SUPPORTED_VERSION {
        return Err(DecodeError::new(
            DecodeErrorKind::VersionTooHigh,
            1,
            Some(version),
        ));
    }
    Ok(version)
}

struct LineContext<'a> {
    catalog: &'a Catalog,
    version: i64,
}

impl LineContext<'_> {
    fn error(&self, kind: DecodeErrorKind, line: usize) -> DecodeError {
        DecodeError::new(kind, line, Some(self.version))
    }

    fn decode_line(
        &self,
        line: &str,
        no: usize,
        objects: &mut ObjectCollection,
    ) -> Result<(), DecodeError> {
        if self.version >= 1 {
            if let Some(rest) = line.strip_prefix(TEXT_BOX_TAG) {
                let text_box = self.decode_text_box(rest, no)?;
                objects.text_boxes.push(text_box);
                return Ok(());
            }
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        for split in (1..=words.len()).rev() {
            let class = words[..split].join(" ");
            let fields = &words[split..];
            if let Some(def_idx) = self.catalog.path_index(&class) {
                objects.paths.push(self.decode_path(def_idx, fields, no)?);
                return Ok(());
            }
            if let Some(def_idx) = self.catalog.building_index(&class) {
                objects.buildings.push(self.decode_building(def_idx, fields, no)?);
                return Ok(());
            }
        }

        let class = words
            .iter()
            .take_while(|word| word.parse::<f64>().is_err())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        Err(self.error(DecodeErrorKind::UnknownClass(class), no))
    }

    fn decode_path(&self, def_idx: usize, fields: &[&str], no: usize) -> Result<Path, DecodeError> {
        let kind = DecodeErrorKind::InvalidPathLine;
        let &[sx, sy, ex, ey] = fields else {
            return Err(self.error(kind, no));
        };
        let num = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|err| self.error(kind.clone(), no).with_source(err))
        };
        let path = Path::new(
            def_idx,
            Point2::new(num(sx)?, num(sy)?),
            Point2::new(num(ex)?, num(ey)?),
        );
        trace!(line = no, def_idx, "读取路径");
        Ok(path)
    }

    fn decode_building(
        &self,
        def_idx: usize,
        fields: &[&str],
        no: usize,
    ) -> Result<Building, DecodeError> {
        let kind = DecodeErrorKind::InvalidBuildingLine;
        let &[x, y, rot] = fields else {
            return Err(self.error(kind, no));
        };
        let num = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|err| self.error(kind.clone(), no).with_source(err))
        };
        let pos = Point2::new(num(x)?, num(y)?);
        let rot: i32 = rot
            .parse()
            .map_err(|err: ParseIntError| self.error(kind.clone(), no).with_source(err))?;
        if rot.rem_euclid(90) != 0 {
            return Err(self.error(kind, no));
        }
        trace!(line = no, def_idx, "读取建筑");
        Ok(Building::new(def_idx, pos, rot))
    }

    fn decode_text_box(&self, rest: &str, no: usize) -> Result<TextBox, DecodeError> {
        let kind = DecodeErrorKind::InvalidTextBoxLine;
        let rest = rest.strip_prefix(' ').ok_or_else(|| self.error(kind.clone(), no))?;
        let mut parts = rest.splitn(5, ' ');
        let mut num = || {
            let raw = parts.next().ok_or_else(|| self.error(kind.clone(), no))?;
            raw.parse::<f64>()
                .map_err(|err| self.error(kind.clone(), no).with_source(err))
        };
        let (x, y, w, h) = (num()?, num()?, num()?, num()?);
        if !(w > 0.0 && h > 0.0) {
            return Err(self.error(kind, no));
        }
        let bounds = Rect::new(x, y, w, h);
        let content = unescape(parts.next().unwrap_or_default())
            .ok_or_else(|| self.error(kind.clone(), no))?;
        Ok(TextBox::new(bounds, content))
    }
}

/// 按建筑、路径、文本框的顺序写出整个对象集合。
pub fn encode(objects: &ObjectCollection, catalog: &Catalog) -> String {
    let mut out = String::new();
    // 写入 String 不会失败
    let _ = writeln!(out, "{VERSION_TAG}{SUPPORTED_VERSION}");
    for building in &objects.buildings {
        let _ = writeln!(
            out,
            "{} {} {} {}",
            catalog.building(building.def_idx).class,
            building.pos.x(),
            building.pos.y(),
            building.rot
        );
    }
    for path in &objects.paths {
        let _ = writeln!(
            out,
            "{} {} {} {} {}",
            catalog.path(path.def_idx).class,
            path.start.x(),
            path.start.y(),
            path.end.x(),
            path.end.y()
        );
    }
    for text_box in &objects.text_boxes {
        let b = text_box.bounds;
        let _ = writeln!(
            out,
            "{TEXT_BOX_TAG} {} {} {} {} {}",
            b.x(),
            b.y(),
            b.width(),
            b.height(),
            escape(&text_box.content)
        );
    }
    out
}

fn escape(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_backslash_and_newlines() {
        let raw = "a\\b\nc\r";
        let escaped = escape(raw);
        assert_eq!(escaped, "a\\\\b\\nc\\r");
        assert!(!escaped.contains('\n'));
        assert_eq!(unescape(&escaped).as_deref(), Some(raw));
    }

    #[test]
    fn unescape_rejects_unknown_sequences() {
        assert_eq!(unescape("tab\\t"), None);
        assert_eq!(unescape("dangling\\"), None);
    }

    #[test]
    fn version_line_variants() {
        assert_eq!(parse_version("#VERSION=0"), Ok(0));
        assert_eq!(parse_version("#VERSION=1"), Ok(1));

        let err = parse_version("#VERSION=-3").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidVersionNumber);
        assert_eq!(err.version, Some(-3));

        let err = parse_version("#VERSION=abc").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidVersionLine);
        assert!(matches!(err.source, Some(NumberError::Int(_))));

        let err = parse_version("VERSION=1").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::InvalidVersionLine);
        assert!(err.source.is_none());
    }

    #[test]
    fn class_names_with_spaces_prefer_longest_match() {
        let catalog = Catalog::builtin();
        let objects = decode(
            "#VERSION=0\nConveyor Splitter 2 3 90\nConveyor Belt 0 0 5 0\n",
            &catalog,
        )
        .expect("decode");
        assert_eq!(objects.buildings.len(), 1);
        assert_eq!(
            catalog.building(objects.buildings[0].def_idx).class,
            "Conveyor Splitter"
        );
        assert_eq!(objects.buildings[0].rot, 90);
        assert_eq!(catalog.path(objects.paths[0].def_idx).class, "Conveyor Belt");
    }

    #[test]
    fn text_box_rows_need_version_one() {
        let catalog = Catalog::builtin();
        let err = decode("#VERSION=0\n#TEXTBOX 0 0 4 2 hi\n", &catalog).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownClass("#TEXTBOX".into()));
        assert_eq!(err.line, 2);

        let objects = decode("#VERSION=1\n#TEXTBOX 0 0 4 2 two  spaces\n", &catalog)
            .expect("decode");
        assert_eq!(objects.text_boxes[0].content, "two  spaces");
    }

    #[test]
    fn encode_writes_current_version_header() {
        let catalog = Catalog::builtin();
        let text = encode(&ObjectCollection::new(), &catalog);
        assert_eq!(text, "#VERSION=1\n");
    }
}
