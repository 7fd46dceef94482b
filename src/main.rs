//! Pagesmith CLI
//!
//! 用法：
//!   pagesmith render <sections.json>        输出区块列表渲染后的 HTML 片段
//!   pagesmith check <sections.json>         校验结构化文本，报告未识别区块与 order 状态
//!   pagesmith generate <title> <brief...>   调用生成服务，输出候选区块列表（JSON）
//!   pagesmith pages                         列出已保存的页面

use anyhow::{bail, Context};
use pagesmith::config::load_config;
use pagesmith::editor::{from_text, to_text};
use pagesmith::generation::{GenerationOptions, PageGenerator};
use pagesmith::llm::create_llm_from_config;
use pagesmith::page::{open_store, PageService};
use pagesmith::render::render;
use pagesmith::schema::is_dense;
use pagesmith::PageError;

const USAGE: &str = "usage: pagesmith <render FILE | check FILE | generate TITLE BRIEF... | pages>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pagesmith::observability::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("render") => {
            let sections = read_sections(args.get(1))?;
            println!("{}", render(&sections).to_html());
        }
        Some("check") => {
            let sections = read_sections(args.get(1))?;
            let unknown: Vec<&str> = sections
                .iter()
                .filter(|s| s.kind().is_none())
                .map(|s| s.type_name())
                .collect();
            println!("{} sections", sections.len());
            if !unknown.is_empty() {
                println!("unrecognized (skipped when rendering): {}", unknown.join(", "));
            }
            if !is_dense(&sections) {
                println!("order values are not 0..n; they will be renumbered on save");
            }
        }
        Some("generate") => {
            let title = args.get(1).context(USAGE)?;
            let brief = args[2..].join(" ");
            generate(title, &brief).await?;
        }
        Some("pages") => {
            let config = load_config(None).unwrap_or_default();
            let service = PageService::new(open_store(&config).await?);
            for page in service.list().await? {
                println!(
                    "{}\t/{}\t{}\t{}",
                    page.id.unwrap_or_default(),
                    page.slug,
                    if page.is_published { "published" } else { "draft" },
                    page.title
                );
            }
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

fn read_sections(path: Option<&String>) -> anyhow::Result<Vec<pagesmith::Section>> {
    let path = path.context(USAGE)?;
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    from_text(&text).with_context(|| format!("{} is not a valid section list", path))
}

async fn generate(title: &str, brief: &str) -> anyhow::Result<()> {
    let config = load_config(None).unwrap_or_default();
    let generator = PageGenerator::new(create_llm_from_config(&config.llm))
        .with_sanitize(config.generation.sanitize_markup);
    let options = GenerationOptions::from_config(&config.generation);

    match generator.generate(title, brief, &options).await {
        Ok(page) => {
            for warning in &page.warnings {
                eprintln!("warning: {:?}", warning);
            }
            println!("{}", to_text(&page.sections)?);
            println!("{}", serde_json::to_string_pretty(&page.meta_tags)?);
            Ok(())
        }
        Err(e @ PageError::MalformedResponse { .. }) => {
            if let Some(raw) = e.raw_response() {
                eprintln!("--- raw response ---\n{}\n--------------------", raw);
            }
            Err(e.into())
        }
        Err(e) => Err(e).context("Generation failed"),
    }
}
