//! Turns assistant content parts into a display view-model.
//!
//! Rendering an `Sql` part runs the statement the first time and caches the
//! result on the part, so redrawing history never touches the warehouse again.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use analyst_core::{ContentPart, Table};
use analyst_warehouse::{SqlExecutor, WarehouseError};

/// The four presentations of a multi-row result, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Table,
    Line,
    Bar,
    Area,
}

impl ViewKind {
    pub fn title(self) -> &'static str {
        match self {
            ViewKind::Table => "Data",
            ViewKind::Line => "Line Chart",
            ViewKind::Bar => "Bar Chart",
            ViewKind::Area => "Area Chart",
        }
    }
}

/// Axis assignment for a chart view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    /// Column used as the x axis; `None` means row position.
    pub category: Option<String>,
    pub series: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultView {
    pub kind: ViewKind,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionChip {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderedBlock {
    Markdown {
        text: String,
    },
    Suggestions {
        chips: Vec<SuggestionChip>,
    },
    Sql {
        statement: String,
        table: Table,
        views: Vec<ResultView>,
    },
}

/// Result of rendering one turn's content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutcome {
    pub request_id: Option<String>,
    pub blocks: Vec<RenderedBlock>,
    /// Text of the chip whose key matched the incoming click.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_suggestion: Option<String>,
}

/// Key of a suggestion chip: `"{message_index}_{suggestion_index}"`.
pub fn chip_key(message_index: usize, suggestion_index: usize) -> String {
    format!("{}_{}", message_index, suggestion_index)
}

/// Views for a query result. A single point is not worth charting.
pub fn views_for(table: &Table) -> Vec<ResultView> {
    let mut views = vec![ResultView {
        kind: ViewKind::Table,
        title: ViewKind::Table.title(),
        chart: None,
    }];

    if table.row_count() > 1 {
        let chart = chart_spec(table);
        views.extend([ViewKind::Line, ViewKind::Bar, ViewKind::Area].map(|kind| ResultView {
            kind,
            title: kind.title(),
            chart: Some(chart.clone()),
        }));
    }

    views
}

fn chart_spec(table: &Table) -> ChartSpec {
    match table.columns.split_first() {
        Some((first, rest)) if !rest.is_empty() => ChartSpec {
            category: Some(first.clone()),
            series: rest.to_vec(),
        },
        _ => ChartSpec {
            category: None,
            series: table.columns.clone(),
        },
    }
}

/// Blocks for a recorded answer, built only from cached results.
///
/// Suggestions are left out since they cannot be acted on from a past
/// answer, and an `Sql` part that never ran has nothing to show.
pub fn cached_blocks(content: &[ContentPart]) -> Vec<RenderedBlock> {
    content
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(RenderedBlock::Markdown { text: text.clone() }),
            ContentPart::Sql {
                statement,
                result: Some(table),
            } => Some(RenderedBlock::Sql {
                statement: statement.clone(),
                table: table.clone(),
                views: views_for(table),
            }),
            _ => None,
        })
        .collect()
}

pub struct TurnRenderer {
    executor: Arc<dyn SqlExecutor>,
}

impl TurnRenderer {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self { executor }
    }

    /// Render `content`, executing any SQL part that has no cached result.
    ///
    /// `message_index` is the turn's position in history and namespaces the
    /// chip keys. A `click` equal to one of this turn's chip keys selects that
    /// suggestion; the caller decides when to act on it.
    pub async fn render(
        &self,
        content: &mut [ContentPart],
        request_id: Option<&str>,
        message_index: usize,
        click: Option<&str>,
    ) -> Result<RenderOutcome, WarehouseError> {
        let mut blocks = Vec::with_capacity(content.len());
        let mut selected_suggestion = None;

        for part in content.iter_mut() {
            match part {
                ContentPart::Text { text } => {
                    blocks.push(RenderedBlock::Markdown { text: text.clone() });
                }
                ContentPart::Suggestions { suggestions } => {
                    let chips: Vec<SuggestionChip> = suggestions
                        .iter()
                        .enumerate()
                        .map(|(i, label)| SuggestionChip {
                            key: chip_key(message_index, i),
                            label: label.clone(),
                        })
                        .collect();
                    if let Some(click) = click {
                        if let Some(chip) = chips.iter().find(|c| c.key == click) {
                            selected_suggestion = Some(chip.label.clone());
                        }
                    }
                    blocks.push(RenderedBlock::Suggestions { chips });
                }
                ContentPart::Sql { statement, result } => {
                    let table = match result {
                        Some(cached) => cached.clone(),
                        None => {
                            let fresh = self.executor.run(statement).await?;
                            debug!(rows = fresh.row_count(), "Cached SQL result on content part");
                            *result = Some(fresh.clone());
                            fresh
                        }
                    };
                    let views = views_for(&table);
                    blocks.push(RenderedBlock::Sql {
                        statement: statement.clone(),
                        table,
                        views,
                    });
                }
                ContentPart::Unknown => {}
            }
        }

        Ok(RenderOutcome {
            request_id: request_id.map(String::from),
            blocks,
            selected_suggestion,
        })
    }
}

impl std::fmt::Debug for TurnRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnRenderer").finish()
    }
}

/// Label of the chip `key` within `content`, if it belongs to this turn.
pub(crate) fn resolve_chip(content: &[ContentPart], message_index: usize, key: &str) -> Option<String> {
    content.iter().find_map(|part| match part {
        ContentPart::Suggestions { suggestions } => suggestions
            .iter()
            .enumerate()
            .find(|(i, _)| chip_key(message_index, *i) == key)
            .map(|(_, label)| label.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed table and counts executions.
    struct CountingExecutor {
        table: Table,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SqlExecutor for CountingExecutor {
        async fn run(&self, _statement: &str) -> Result<Table, WarehouseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.table.clone())
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl SqlExecutor for FailingExecutor {
        async fn run(&self, statement: &str) -> Result<Table, WarehouseError> {
            Err(WarehouseError::query_failed(statement, "permission denied"))
        }
    }

    fn monthly(rows: usize) -> Table {
        Table::new(
            vec!["MONTH".into(), "REVENUE".into(), "COST".into()],
            (0..rows)
                .map(|i| vec![json!(format!("2023-{:02}", i + 1)), json!(i * 10), json!(i)])
                .collect(),
        )
    }

    fn counting(table: Table) -> Arc<CountingExecutor> {
        Arc::new(CountingExecutor {
            table,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_single_row_gets_table_view_only() {
        let views = views_for(&monthly(1));
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].kind, ViewKind::Table);
        assert!(views[0].chart.is_none());
    }

    #[test]
    fn test_empty_result_gets_table_view_only() {
        assert_eq!(views_for(&Table::default()).len(), 1);
    }

    #[test]
    fn test_multi_row_gets_four_views_in_order() {
        let views = views_for(&monthly(3));
        let titles: Vec<&str> = views.iter().map(|v| v.title).collect();
        assert_eq!(titles, vec!["Data", "Line Chart", "Bar Chart", "Area Chart"]);

        let chart = views[1].chart.as_ref().unwrap();
        assert_eq!(chart.category.as_deref(), Some("MONTH"));
        assert_eq!(chart.series, vec!["REVENUE", "COST"]);
    }

    #[test]
    fn test_single_column_charts_use_row_position() {
        let table = Table::new(vec!["N".into()], vec![vec![json!(1)], vec![json!(2)]]);
        let views = views_for(&table);
        let chart = views[3].chart.as_ref().unwrap();
        assert!(chart.category.is_none());
        assert_eq!(chart.series, vec!["N"]);
    }

    #[tokio::test]
    async fn test_render_text_and_suggestions() {
        let renderer = TurnRenderer::new(counting(Table::default()));
        let mut content = vec![
            ContentPart::text("I can answer these:"),
            ContentPart::Suggestions {
                suggestions: vec!["Revenue by month?".into(), "Top regions?".into()],
            },
        ];

        let outcome = renderer
            .render(&mut content, Some("req-1"), 4, None)
            .await
            .unwrap();

        assert_eq!(outcome.request_id.as_deref(), Some("req-1"));
        assert_eq!(
            outcome.blocks[0],
            RenderedBlock::Markdown {
                text: "I can answer these:".into()
            }
        );
        match &outcome.blocks[1] {
            RenderedBlock::Suggestions { chips } => {
                assert_eq!(chips[0].key, "4_0");
                assert_eq!(chips[1].key, "4_1");
                assert_eq!(chips[1].label, "Top regions?");
            }
            other => panic!("unexpected block: {other:?}"),
        }
        assert!(outcome.selected_suggestion.is_none());
    }

    #[tokio::test]
    async fn test_click_selects_matching_chip() {
        let renderer = TurnRenderer::new(counting(Table::default()));
        let mut content = vec![ContentPart::Suggestions {
            suggestions: vec!["a".into(), "b".into()],
        }];

        let outcome = renderer
            .render(&mut content, None, 2, Some("2_1"))
            .await
            .unwrap();
        assert_eq!(outcome.selected_suggestion.as_deref(), Some("b"));

        let outcome = renderer
            .render(&mut content, None, 2, Some("3_1"))
            .await
            .unwrap();
        assert!(outcome.selected_suggestion.is_none());
    }

    #[tokio::test]
    async fn test_sql_result_is_cached_on_part() {
        let executor = counting(monthly(3));
        let renderer = TurnRenderer::new(executor.clone());
        let mut content = vec![ContentPart::sql("SELECT * FROM revenue")];

        let first = renderer.render(&mut content, None, 1, None).await.unwrap();
        let second = renderer.render(&mut content, None, 1, None).await.unwrap();

        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        match &content[0] {
            ContentPart::Sql { result, .. } => assert_eq!(result.as_ref(), Some(&monthly(3))),
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_failure_propagates_and_caches_nothing() {
        let renderer = TurnRenderer::new(Arc::new(FailingExecutor));
        let mut content = vec![ContentPart::sql("SELECT secret FROM vault")];

        let err = renderer
            .render(&mut content, None, 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WarehouseError::QueryFailed { .. }));
        assert_eq!(content[0], ContentPart::sql("SELECT secret FROM vault"));
    }

    #[test]
    fn test_resolve_chip() {
        let content = vec![
            ContentPart::text("x"),
            ContentPart::Suggestions {
                suggestions: vec!["first".into(), "second".into()],
            },
        ];
        assert_eq!(resolve_chip(&content, 5, "5_1").as_deref(), Some("second"));
        assert!(resolve_chip(&content, 5, "5_2").is_none());
        assert!(resolve_chip(&content, 4, "5_0").is_none());
    }

    #[test]
    fn test_rendered_block_serializes_with_type_tag() {
        let block = RenderedBlock::Markdown { text: "hi".into() };
        assert_eq!(
            serde_json::to_value(block).unwrap(),
            json!({"type": "markdown", "text": "hi"})
        );
    }

    #[test]
    fn test_cached_blocks_use_stored_results_and_skip_suggestions() {
        let content = vec![
            ContentPart::text("Revenue by month"),
            ContentPart::Suggestions {
                suggestions: vec!["And cost?".into()],
            },
            ContentPart::Sql {
                statement: "SELECT month, revenue, cost FROM sales".into(),
                result: Some(monthly(3)),
            },
            ContentPart::sql("SELECT 1"),
        ];

        let blocks = cached_blocks(&content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            RenderedBlock::Markdown {
                text: "Revenue by month".into()
            }
        );
        match &blocks[1] {
            RenderedBlock::Sql { table, views, .. } => {
                assert_eq!(table.row_count(), 3);
                assert_eq!(views.len(), 4);
            }
            other => panic!("unexpected block: {other:?}"),
        }
    }
}
