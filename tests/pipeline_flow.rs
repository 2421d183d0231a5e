//! End-to-end flow: load a file, rewrite every row, write the result, read it back.

use async_trait::async_trait;
use seo_rewriter::config::GenerationConfig;
use seo_rewriter::error::{TableError, TransformError};
use seo_rewriter::llm::openai::OpenAiClient;
use seo_rewriter::llm::types::GenerationRequest;
use seo_rewriter::llm::TextGenerator;
use seo_rewriter::pipeline::PipelineRunner;
use seo_rewriter::rewrite::{RowTransformer, SENTINEL};
use seo_rewriter::table::{loader, writer, CellValue, Row, Table};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Returns the quoted description from the prompt unchanged.
struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, TransformError> {
        let start = request.prompt.find(": '").map(|i| i + 3).unwrap_or(0);
        let quoted = &request.prompt[start..];
        Ok(quoted.strip_suffix('\'').unwrap_or(quoted).to_string())
    }
}

fn runner(generator: Arc<dyn TextGenerator>) -> PipelineRunner {
    PipelineRunner::new(Arc::new(RowTransformer::new(generator, &GenerationConfig::default())))
}

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

#[tokio::test]
async fn test_catchy_widget_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products.csv");
    std::fs::write(&path, "Name,Id,Description\nMake catchy,1,\nWidget,2,a small part\n").unwrap();

    let table = loader::load(&path).unwrap();
    let instruction = table.instruction().unwrap();
    assert_eq!(instruction, "Make catchy");

    let (tx, _rx) = mpsc::unbounded_channel();
    let out = runner(Arc::new(EchoGenerator)).run(&table, &instruction, &tx).await.unwrap();

    assert_eq!(out.table.rows.len(), 1);
    assert_eq!(out.table.cell(0, "Name"), Some(&text("Widget")));
    assert_eq!(out.table.cell(0, "Id"), Some(&CellValue::Number(2.0)));
    assert_eq!(out.table.cell(0, "Description"), Some(&text("A small part")));
}

#[tokio::test]
async fn test_row_count_and_order_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products.csv");
    let mut csv = String::from("Id,Name,Description\n1,Rewrite for search,\n");
    for i in 2..=25 {
        csv.push_str(&format!("{},Item {},Description number {}\n", i, i, i));
    }
    std::fs::write(&path, csv).unwrap();

    let loaded = loader::load_with_instruction(&path, None).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let out = runner(Arc::new(EchoGenerator))
        .run(&loaded.table, &loaded.instruction, &tx)
        .await
        .unwrap();

    assert_eq!(out.table.rows.len(), loaded.table.rows.len() - 1);
    for (i, row) in out.table.rows.iter().enumerate() {
        assert_eq!(row.get(0), &CellValue::Number((i + 2) as f64));
    }

    let mut published = 0;
    while rx.try_recv().is_ok() {
        published += 1;
    }
    assert_eq!(published, 24);
}

#[tokio::test]
async fn test_write_and_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.xlsx");
    let output = dir.path().join("output.xlsx");

    let mut source = Table::new(vec!["Name".to_string(), "Id".to_string(), "Description".to_string()]);
    source.rows.push(Row::new(vec![text("Make catchy"), CellValue::Number(1.0), CellValue::Blank]));
    source.rows.push(Row::new(vec![text("Widget"), CellValue::Number(2.0), text("A small part")]));
    source.rows.push(Row::new(vec![text("Gadget"), CellValue::Number(3.0), text("Fits in a pocket")]));
    writer::write(&source, &input).unwrap();

    let loaded = loader::load_with_instruction(&input, None).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let out = runner(Arc::new(EchoGenerator))
        .run(&loaded.table, &loaded.instruction, &tx)
        .await
        .unwrap();
    writer::write(&out.table, &output).unwrap();

    let back = loader::read_table(&output).unwrap();
    assert_eq!(back.columns, source.columns);
    assert_eq!(back.rows, source.rows[1..].to_vec());
}

#[tokio::test]
async fn test_unreachable_service_keeps_original_text() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products.csv");
    std::fs::write(&path, "Name,Id,Description\nMake catchy,1,\nWidget,2,a small part\nBolt,3,\n").unwrap();

    let client = OpenAiClient::new("sk-test".to_string(), "http://127.0.0.1:9/v1", "gpt-3.5-turbo");
    let loaded = loader::load_with_instruction(&path, None).unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let out = runner(Arc::new(client))
        .run(&loaded.table, &loaded.instruction, &tx)
        .await
        .unwrap();

    assert_eq!(out.stats.fallback, 1);
    assert_eq!(out.stats.sentinel, 1);
    assert_eq!(out.table.cell(0, "Description"), Some(&text("A small part")));
    assert_eq!(out.table.cell(1, "Description"), Some(&text(SENTINEL)));
}

#[test]
fn test_load_errors_block_the_run() {
    let dir = tempfile::tempdir().unwrap();

    let no_id = dir.path().join("no_id.csv");
    std::fs::write(&no_id, "Name,Description\nMake catchy,\n").unwrap();
    assert!(matches!(loader::load(&no_id), Err(TableError::Schema { .. })));

    let no_prompt = dir.path().join("no_prompt.csv");
    std::fs::write(&no_prompt, "Name,Id,Description\n ,1,\nWidget,2,part\n").unwrap();
    assert!(matches!(loader::load(&no_prompt), Err(TableError::Instruction(_))));

    let fake = dir.path().join("fake.xlsx");
    std::fs::write(&fake, "Name,Id,Description\n").unwrap();
    assert_eq!(
        loader::load(&fake).unwrap_err(),
        TableError::Format("The file is not a valid .xlsx file.".to_string())
    );
}
