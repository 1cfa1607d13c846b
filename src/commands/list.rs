use super::CommandContext;
use crate::core::VentureId;
use crate::io::OutreachView;
use crate::portfolio::{ListQuery, OutreachList};
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ListConfig {
    pub data: PathBuf,
    pub list: OutreachList,
    pub venture: VentureId,
    pub limit: usize,
    pub min_score: f64,
    pub include_test: bool,
}

impl ListConfig {
    fn query(&self) -> ListQuery {
        ListQuery::new(self.venture)
            .with_limit(self.limit)
            .with_min_score(self.min_score)
            .with_test_data(self.include_test)
    }
}

pub fn run_list(ctx: &CommandContext, config: ListConfig) -> Result<OutreachView> {
    let engine = ctx.open_engine(&config.data)?;
    let shippers = engine
        .outreach_list(config.list, &config.query(), ctx.now)
        .with_context(|| format!("Failed to build {} list", config.list))?;

    let view = OutreachView {
        list: config.list,
        shippers,
    };
    ctx.print(&view)?;
    Ok(view)
}
