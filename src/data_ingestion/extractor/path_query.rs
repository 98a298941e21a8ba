//! 以結構查詢定位表格的後備策略
//!
//! 以 `/` 開頭的查詢視為 XPath 子集：
//!
//! - `/tag` 子元素、`//tag` 後代元素、`*` 任意元素
//! - `[n]` 位置（從 1 開始，依每個父節點計算）
//! - `[@attr='value']` 屬性相等
//!
//! 其他查詢一律以 CSS 選擇器解析。

use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{cell_text, child_elements, TableStrategy};
use crate::data_ingestion::error::{IngestionError, IngestionResult};
use crate::data_ingestion::normalizer::{normalize_table, RawTable};
use crate::domain_types::CdsRecord;

static THEAD_TH: Lazy<Selector> =
    Lazy::new(|| Selector::parse("thead th").expect("valid selector"));
static TBODY_TR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tbody tr").expect("valid selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    Name(String),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Position(usize),
    AttrEquals { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Predicate>,
}

impl Step {
    fn matches(&self, element: &ElementRef<'_>) -> bool {
        match &self.test {
            NodeTest::Any => true,
            NodeTest::Name(name) => element.value().name().eq_ignore_ascii_case(name),
        }
    }
}

/// 求值時的上下文節點
#[derive(Clone, Copy)]
enum Context<'a> {
    Document(&'a Html),
    Element(ElementRef<'a>),
}

impl<'a> Context<'a> {
    fn children(self) -> Vec<ElementRef<'a>> {
        match self {
            Context::Document(html) => vec![html.root_element()],
            Context::Element(el) => el.children().filter_map(ElementRef::wrap).collect(),
        }
    }

    /// 不含自身的所有後代元素，依文件順序
    fn descendants(self) -> Vec<ElementRef<'a>> {
        match self {
            Context::Document(html) => html
                .root_element()
                .descendants()
                .filter_map(ElementRef::wrap)
                .collect(),
            Context::Element(el) => el
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .collect(),
        }
    }
}

/// 已解析的結構查詢
#[derive(Debug, Clone)]
pub enum StructuralQuery {
    Path(Vec<Step>),
    Css(Selector),
}

impl StructuralQuery {
    pub fn parse(query: &str) -> IngestionResult<Self> {
        let query = query.trim();
        let invalid = |reason: &str| IngestionError::InvalidQuery {
            query: query.to_string(),
            reason: reason.to_string(),
        };

        if query.is_empty() {
            return Err(invalid("查詢為空"));
        }

        if query.starts_with('/') {
            parse_path(query).map(Self::Path).map_err(|reason| invalid(&reason))
        } else {
            Selector::parse(query)
                .map(Self::Css)
                .map_err(|e| invalid(&e.to_string()))
        }
    }

    /// 依文件順序回傳符合的元素
    pub fn select<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Self::Css(selector) => document.select(selector).collect(),
            Self::Path(steps) => {
                let mut contexts = vec![Context::Document(document)];
                for step in steps {
                    let matched = apply_step(&contexts, step);
                    if matched.is_empty() {
                        return Vec::new();
                    }
                    contexts = matched.into_iter().map(Context::Element).collect();
                }
                contexts
                    .into_iter()
                    .filter_map(|ctx| match ctx {
                        Context::Element(el) => Some(el),
                        Context::Document(_) => None,
                    })
                    .collect()
            }
        }
    }
}

fn apply_step<'a>(contexts: &[Context<'a>], step: &Step) -> Vec<ElementRef<'a>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for &ctx in contexts {
        // `//x` 等同 descendant-or-self::node()/child::x，位置依各父節點計算
        let parents: Vec<Context<'a>> = match step.axis {
            Axis::Child => vec![ctx],
            Axis::Descendant => std::iter::once(ctx)
                .chain(ctx.descendants().into_iter().map(Context::Element))
                .collect(),
        };

        for parent in parents {
            let mut matched: Vec<ElementRef<'a>> = parent
                .children()
                .into_iter()
                .filter(|el| step.matches(el))
                .collect();

            for predicate in &step.predicates {
                matched = match predicate {
                    Predicate::Position(n) => matched.get(n - 1).copied().into_iter().collect(),
                    Predicate::AttrEquals { name, value } => matched
                        .into_iter()
                        .filter(|el| el.value().attr(name) == Some(value.as_str()))
                        .collect(),
                };
            }

            for el in matched {
                if seen.insert(el.id()) {
                    out.push(el);
                }
            }
        }
    }

    out
}

fn parse_path(query: &str) -> Result<Vec<Step>, String> {
    let mut steps = Vec::new();
    let mut rest = query;

    while !rest.is_empty() {
        let axis = if let Some(r) = rest.strip_prefix("//") {
            rest = r;
            Axis::Descendant
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            Axis::Child
        } else {
            return Err(format!("預期 `/`，位於 `{rest}`"));
        };

        let name_end = rest.find(['/', '[']).unwrap_or(rest.len());
        let name = rest[..name_end].trim();
        rest = &rest[name_end..];

        let test = match name {
            "" => return Err("缺少節點名稱".to_string()),
            "*" => NodeTest::Any,
            n if n.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') => {
                NodeTest::Name(n.to_ascii_lowercase())
            }
            n => return Err(format!("不支援的節點測試 `{n}`")),
        };

        let mut predicates = Vec::new();
        while let Some(r) = rest.strip_prefix('[') {
            let close = r.find(']').ok_or_else(|| "缺少 `]`".to_string())?;
            predicates.push(parse_predicate(r[..close].trim())?);
            rest = &r[close + 1..];
        }

        steps.push(Step {
            axis,
            test,
            predicates,
        });
    }

    Ok(steps)
}

fn parse_predicate(body: &str) -> Result<Predicate, String> {
    if let Ok(n) = body.parse::<usize>() {
        return if n == 0 {
            Err("位置從 1 開始".to_string())
        } else {
            Ok(Predicate::Position(n))
        };
    }

    let attr = body
        .strip_prefix('@')
        .ok_or_else(|| format!("不支援的條件 `{body}`"))?;
    let (name, value) = attr
        .split_once('=')
        .ok_or_else(|| format!("不支援的條件 `{body}`"))?;
    let value = value.trim();
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or_else(|| format!("屬性值需加引號 `{value}`"))?;

    Ok(Predicate::AttrEquals {
        name: name.trim().to_string(),
        value: unquoted.to_string(),
    })
}

/// 依設定的結構查詢定位表格
#[derive(Debug, Clone)]
pub struct PathQueryStrategy {
    raw: String,
    query: StructuralQuery,
}

impl PathQueryStrategy {
    pub fn new(query: &str) -> IngestionResult<Self> {
        Ok(Self {
            raw: query.to_string(),
            query: StructuralQuery::parse(query)?,
        })
    }

    pub fn query(&self) -> &str {
        &self.raw
    }

    /// 欄位名稱取自 `thead th`，資料列取自 `tbody tr` 的直接 `td`
    ///
    /// 比欄位名稱短的列以空字串補齊，多出的儲存格忽略。
    fn read_table(table: ElementRef<'_>) -> Option<RawTable> {
        let headers: Vec<String> = table.select(&THEAD_TH).map(cell_text).collect();
        if headers.is_empty() {
            return None;
        }

        let rows: Vec<Vec<String>> = table
            .select(&TBODY_TR)
            .map(|tr| child_elements(tr, "td").map(cell_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .map(|mut cells| {
                cells.resize(headers.len(), String::new());
                cells
            })
            .collect();
        if rows.is_empty() {
            return None;
        }

        Some(RawTable::new(headers, rows))
    }
}

impl TableStrategy for PathQueryStrategy {
    fn name(&self) -> &'static str {
        "path_query"
    }

    fn extract(&self, document: &Html) -> Option<Vec<CdsRecord>> {
        let table = match self.query.select(document).into_iter().next() {
            Some(table) => table,
            None => {
                debug!("結構查詢 `{}` 沒有符合的元素", self.raw);
                return None;
            }
        };

        let raw = Self::read_table(table)?;
        Some(normalize_table(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    const PAGE: &str = r#"
        <html><body>
          <div id="top"></div>
          <div>
            <div class="a"><span>one</span></div>
            <div class="b">
              <p>x</p>
              <table id="hist">
                <thead><tr><th>Data</th><th>Último</th><th>Abertura</th></tr></thead>
                <tbody>
                  <tr><td>05.11.2025</td><td>1,40</td></tr>
                  <tr><td>06.11.2025</td><td>1,41</td><td>1,39</td><td>extra</td></tr>
                </tbody>
              </table>
            </div>
          </div>
        </body></html>"#;

    fn ids(query: &str, html: &Html) -> Vec<String> {
        StructuralQuery::parse(query)
            .unwrap()
            .select(html)
            .into_iter()
            .map(|el| el.value().attr("id").unwrap_or(el.value().name()).to_string())
            .collect()
    }

    #[rstest]
    #[case("/html/body/div[2]/div[2]/table")]
    #[case("//table")]
    #[case("//div[@class='b']/table")]
    #[case("/html/body/*[2]//table[1]")]
    #[case("table#hist")]
    #[case("div.b > table")]
    fn test_queries_locate_table(#[case] query: &str) {
        let html = Html::parse_document(PAGE);
        assert_eq!(ids(query, &html), vec!["hist"]);
    }

    #[test]
    fn test_position_is_per_parent() {
        let html = Html::parse_document(
            "<div><p id='a'></p><p id='b'></p></div><div><p id='c'></p></div>",
        );
        assert_eq!(ids("//p[1]", &html), vec!["a", "c"]);
        assert_eq!(ids("//p[2]", &html), vec!["b"]);
        assert!(ids("/html/body/div[3]", &html).is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("/html/")]
    #[case("/html/body[0]")]
    #[case("/html/body[last()]")]
    #[case("/html/body[@id=top]")]
    #[case("/html/body[1")]
    #[case("div[")]
    fn test_invalid_queries(#[case] query: &str) {
        assert_matches!(
            StructuralQuery::parse(query),
            Err(IngestionError::InvalidQuery { .. })
        );
    }

    #[test]
    fn test_rows_are_padded_and_truncated() {
        let html = Html::parse_document(PAGE);
        let strategy = PathQueryStrategy::new("//table").unwrap();
        let table = strategy.query.select(&html)[0];
        let raw = PathQueryStrategy::read_table(table).unwrap();

        assert_eq!(raw.rows[0], vec!["05.11.2025", "1,40", ""]);
        assert_eq!(raw.rows[1], vec!["06.11.2025", "1,41", "1,39"]);

        let records = strategy.extract(&html).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].open, None);
        assert!((records[1].open.unwrap() - 0.0139).abs() < 1e-12);
    }

    #[test]
    fn test_no_headers_or_rows() {
        let no_head = Html::parse_document(
            "<table><tbody><tr><td>05.11.2025</td><td>1,40</td></tr></tbody></table>",
        );
        assert!(PathQueryStrategy::new("//table").unwrap().extract(&no_head).is_none());

        let no_rows = Html::parse_document(
            "<table><thead><tr><th>Data</th><th>Último</th></tr></thead><tbody></tbody></table>",
        );
        assert!(PathQueryStrategy::new("//table").unwrap().extract(&no_rows).is_none());
    }
}
