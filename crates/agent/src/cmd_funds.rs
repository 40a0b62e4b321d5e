//! Campaign command handlers against the backend REST API.

use anyhow::{Context, Result};
use fundra_backend::{BackendClient, Fund, FundDraft};
use fundra_common::Config;

fn client(config: &Config) -> BackendClient {
    BackendClient::new(config.backend_url.clone())
}

/// Collected-to-target ratio as a percentage, capped at 100.
///
/// u128 keeps `collected * 100` from overflowing for large amounts.
fn progress_percent(collected: u64, target: u64) -> u64 {
    if target == 0 {
        return 0;
    }
    (collected as u128 * 100 / target as u128).min(100) as u64
}

fn print_fund(fund: &Fund) {
    let progress = progress_percent(fund.collected, fund.target);
    println!("#{} {}", fund.id, fund.title);
    println!("  {}", fund.description);
    println!(
        "  collected {} / {} ({}%), {} donations",
        fund.collected, fund.target, progress, fund.donate_count
    );
    if let Some(url) = &fund.photo_url {
        println!("  photo: {}", url);
    }
    println!("  created: {}", fund.created_at);
}

pub async fn handle_list(config: &Config, limit: u32, offset: u32, json: bool) -> Result<()> {
    let funds = client(config)
        .list_funds(limit, offset)
        .await
        .context("failed to list campaigns")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&funds)?);
    } else if funds.is_empty() {
        println!("No campaigns");
    } else {
        for fund in &funds {
            print_fund(fund);
        }
    }
    Ok(())
}

pub async fn handle_show(config: &Config, fund_id: i64, json: bool) -> Result<()> {
    let fund = client(config)
        .get_fund(fund_id)
        .await
        .context("failed to fetch campaign")?
        .with_context(|| format!("campaign {} not found", fund_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&fund)?);
    } else {
        print_fund(&fund);
    }
    Ok(())
}

pub async fn handle_create(
    config: &Config,
    title: String,
    description: String,
    target: u64,
    category_id: Option<i64>,
    photo_url: Option<String>,
) -> Result<()> {
    let draft = FundDraft {
        title: Some(title),
        description: Some(description),
        target: Some(target),
        category_id,
        photo_url,
        ..FundDraft::default()
    };
    let fund = client(config)
        .create_fund(&draft)
        .await
        .context("failed to create campaign")?;
    println!("Created campaign {}", fund.id);
    print_fund(&fund);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_update(
    config: &Config,
    fund_id: i64,
    title: Option<String>,
    description: Option<String>,
    target: Option<u64>,
    category_id: Option<i64>,
    photo_url: Option<String>,
) -> Result<()> {
    let draft = FundDraft {
        title,
        description,
        target,
        category_id,
        photo_url,
        ..FundDraft::default()
    };
    let fund = client(config)
        .update_fund(fund_id, &draft)
        .await
        .context("failed to update campaign")?;
    print_fund(&fund);
    Ok(())
}

pub async fn handle_delete(config: &Config, fund_id: i64) -> Result<()> {
    let resp = client(config)
        .delete_fund(fund_id)
        .await
        .context("failed to delete campaign")?;
    println!("{}", resp.detail);
    Ok(())
}

pub async fn handle_donate(config: &Config, fund_id: i64, amount: u64) -> Result<()> {
    let fund = client(config)
        .donate(fund_id, amount)
        .await
        .context("failed to record donation")?;
    println!("Recorded donation of {} to campaign {}", amount, fund_id);
    print_fund(&fund);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_caps_and_survives_large_amounts() {
        assert_eq!(progress_percent(500, 1_000), 50);
        assert_eq!(progress_percent(2_000, 1_000), 100);
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(u64::MAX, u64::MAX), 100);
        assert_eq!(progress_percent(u64::MAX, 1), 100);
    }
}
