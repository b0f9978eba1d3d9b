use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use watt_node::{config::LedgerConfig, logging, LedgerNode};
use watt_types::{
    BountyId, BountySpec, BountyStatus, BountyTier, ClaimId, CommunityVerdict, DimensionScore,
    Disposition, HumanDecision, LedgerError, RubricDimension, SubmissionId, WalletAddress,
    WattAmount,
};

#[derive(Parser)]
#[command(name = "watt-ledger")]
#[command(about = "WATT bounty and stake ledger", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output directory for the configuration
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Post a bounty
    CreateBounty {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// low, medium, high or critical
        #[arg(long)]
        tier: String,
        /// Reward in WATT
        #[arg(long)]
        reward: f64,
        /// Fraction of the reward required as stake
        #[arg(long, default_value = "0.10")]
        stake_percent: f64,
        /// External issue-tracker identifier
        #[arg(long)]
        issue_ref: String,
    },

    /// List bounties, optionally filtered by status and tier
    ListBounties {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        tier: Option<String>,
    },

    /// Reserve an open bounty for a contributor
    Claim {
        #[arg(long)]
        bounty_id: BountyId,
        /// Contributor wallet address (hex, 0x- or watt:-prefixed)
        #[arg(long)]
        contributor: String,
    },

    /// Confirm a stake transfer and start the work window
    ConfirmStake {
        #[arg(long)]
        claim_id: ClaimId,
        /// Gateway transaction reference; omitted in standalone mode,
        /// where the node executes the transfer itself
        #[arg(long)]
        tx_ref: Option<String>,
    },

    /// Grant the one permitted deadline extension
    Extend {
        #[arg(long)]
        claim_id: ClaimId,
        #[arg(long)]
        days: i64,
        #[arg(long)]
        reason: String,
    },

    /// Attach a work artifact to an active claim
    Submit {
        #[arg(long)]
        claim_id: ClaimId,
        #[arg(long)]
        artifact_ref: String,
    },

    /// Record an automated rubric score
    RecordScore {
        #[arg(long)]
        submission_id: SubmissionId,
        /// Repeated dimension=score pairs, e.g. --score code-quality=9.2
        #[arg(long = "score", value_name = "DIM=SCORE")]
        scores: Vec<String>,
        /// Dimensions with an open concern
        #[arg(long = "concern", value_name = "DIM")]
        concerns: Vec<String>,
    },

    /// Record one community reviewer's verdict
    RecordReview {
        #[arg(long)]
        submission_id: SubmissionId,
        #[arg(long)]
        reviewer: String,
        /// approve or flag
        #[arg(long)]
        verdict: String,
        #[arg(long, default_value = "general")]
        category: String,
    },

    /// Record the human decision on a submission
    RecordDecision {
        #[arg(long)]
        submission_id: SubmissionId,
        /// approve, reject or request-changes
        #[arg(long)]
        decision: String,
    },

    /// Settle a concluded claim
    Settle {
        #[arg(long)]
        claim_id: ClaimId,
        /// merged, good-faith, low-quality, abandoned or malicious
        #[arg(long)]
        disposition: String,
        /// Stake return fraction for good-faith settlements, in [0.5, 1.0]
        #[arg(long)]
        stake_return_fraction: Option<f64>,
    },

    /// Expire overdue claims and reopen their bounties
    Sweep,
}

fn parse_tier(s: &str) -> Result<BountyTier> {
    match s.to_lowercase().as_str() {
        "low" => Ok(BountyTier::Low),
        "medium" => Ok(BountyTier::Medium),
        "high" => Ok(BountyTier::High),
        "critical" => Ok(BountyTier::Critical),
        other => anyhow::bail!("unknown tier: {}", other),
    }
}

fn parse_status(s: &str) -> Result<BountyStatus> {
    match s.to_lowercase().as_str() {
        "open" => Ok(BountyStatus::Open),
        "claimed" => Ok(BountyStatus::Claimed),
        "submitted" => Ok(BountyStatus::Submitted),
        "under-review" => Ok(BountyStatus::UnderReview),
        "settled" => Ok(BountyStatus::Settled),
        "expired" => Ok(BountyStatus::Expired),
        "cancelled" => Ok(BountyStatus::Cancelled),
        other => anyhow::bail!("unknown status: {}", other),
    }
}

fn parse_dimension(s: &str) -> Result<RubricDimension> {
    match s.to_lowercase().as_str() {
        "mission-alignment" => Ok(RubricDimension::MissionAlignment),
        "legitimacy" => Ok(RubricDimension::Legitimacy),
        "impact-vs-effort" => Ok(RubricDimension::ImpactVsEffort),
        "code-quality" => Ok(RubricDimension::CodeQuality),
        "breaking-change-risk" => Ok(RubricDimension::BreakingChangeRisk),
        "value-change-risk" => Ok(RubricDimension::ValueChangeRisk),
        other => anyhow::bail!("unknown rubric dimension: {}", other),
    }
}

fn parse_disposition(s: &str, fraction: Option<f64>) -> Result<Disposition> {
    match s.to_lowercase().as_str() {
        "merged" => Ok(Disposition::Merged),
        "good-faith" => {
            let stake_return_fraction = fraction
                .context("good-faith settlement requires --stake-return-fraction")?;
            Ok(Disposition::GoodFaithIncomplete {
                stake_return_fraction,
            })
        }
        "low-quality" => Ok(Disposition::LowQuality),
        "abandoned" => Ok(Disposition::Abandoned),
        "malicious" => Ok(Disposition::Malicious),
        other => anyhow::bail!("unknown disposition: {}", other),
    }
}

fn load_config(cli_config: Option<&Path>) -> Result<LedgerConfig> {
    let mut config = if let Some(path) = cli_config {
        LedgerConfig::from_file(path)?
    } else if Path::new("./watt-ledger.toml").exists() {
        LedgerConfig::from_file(Path::new("./watt-ledger.toml"))?
    } else {
        LedgerConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.logging, cli.verbose)?;

    if let Commands::Init { output } = &cli.command {
        let path = output.join("watt-ledger.toml");
        LedgerConfig::default().save_to_file(&path)?;
        println!("{}", json!({ "config": path }));
        return Ok(());
    }

    let node = LedgerNode::new(config).await?;
    match run(&node, cli.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "{}",
                json!({ "error": e.kind(), "message": e.to_string() })
            );
            std::process::exit(1);
        }
    }
}

async fn run(node: &LedgerNode, command: Commands) -> watt_types::Result<serde_json::Value> {
    let invalid = |m: String| LedgerError::InvalidParameter(m);

    match command {
        Commands::Init { .. } => unreachable!("handled before node construction"),

        Commands::CreateBounty {
            title,
            description,
            tier,
            reward,
            stake_percent,
            issue_ref,
        } => {
            let tier = parse_tier(&tier).map_err(|e| invalid(e.to_string()))?;
            let bounty = node
                .registry
                .create_bounty(
                    BountySpec {
                        title,
                        description,
                        tier,
                        reward: WattAmount::from_watt(reward),
                        stake_percent,
                        issue_ref,
                    },
                    Utc::now(),
                )
                .await?;
            Ok(json!({
                "bounty_id": bounty.id,
                "status": bounty.status.to_string(),
                "required_stake": bounty.required_stake().to_watt(),
                "stake_memo": bounty.stake_memo(),
            }))
        }

        Commands::ListBounties { status, tier } => {
            let status = status
                .map(|s| parse_status(&s))
                .transpose()
                .map_err(|e| invalid(e.to_string()))?;
            let tier = tier
                .map(|t| parse_tier(&t))
                .transpose()
                .map_err(|e| invalid(e.to_string()))?;
            let bounties = node.registry.list_bounties(status).await?;
            let bounties: Vec<_> = bounties
                .into_iter()
                .filter(|b| tier.map_or(true, |t| b.tier == t))
                .collect();
            let rows: Vec<_> = bounties
                .iter()
                .map(|b| {
                    json!({
                        "bounty_id": b.id,
                        "title": b.title,
                        "tier": b.tier.to_string(),
                        "reward": b.reward.to_watt(),
                        "status": b.status.to_string(),
                        "issue_ref": b.issue_ref,
                    })
                })
                .collect();
            Ok(json!({ "bounties": rows }))
        }

        Commands::Claim {
            bounty_id,
            contributor,
        } => {
            let contributor = WalletAddress::from_string(&contributor)?;
            let bounty = node.registry.get_bounty(bounty_id).await?;
            let claim = node.claims.claim(&bounty, contributor, Utc::now()).await?;
            Ok(json!({
                "claim_id": claim.id,
                "status": claim.status.to_string(),
                "required_stake": claim.stake.to_watt(),
                "stake_memo": bounty.stake_memo(),
            }))
        }

        Commands::ConfirmStake { claim_id, tx_ref } => {
            let claim = match tx_ref {
                Some(tx_ref) => {
                    node.claims
                        .confirm_stake(claim_id, &tx_ref, Utc::now())
                        .await?
                }
                None => node.post_stake(claim_id).await?,
            };
            Ok(json!({
                "claim_id": claim.id,
                "status": claim.status.to_string(),
                "deadline": claim.deadline,
                "stake_tx_ref": claim.stake_tx_ref,
            }))
        }

        Commands::Extend {
            claim_id,
            days,
            reason,
        } => {
            let claim = node.claims.extend(claim_id, days, &reason).await?;
            Ok(json!({
                "claim_id": claim.id,
                "deadline": claim.deadline,
                "extension_used": claim.extension_used,
            }))
        }

        Commands::Submit {
            claim_id,
            artifact_ref,
        } => {
            let (claim, submission) = node
                .claims
                .submit(claim_id, &artifact_ref, Utc::now())
                .await?;
            Ok(json!({
                "claim_id": claim.id,
                "submission_id": submission.id,
                "status": claim.status.to_string(),
            }))
        }

        Commands::RecordScore {
            submission_id,
            scores,
            concerns,
        } => {
            let mut dimensions = Vec::new();
            for pair in &scores {
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| invalid(format!("malformed score pair: {}", pair)))?;
                let dimension = parse_dimension(name).map_err(|e| invalid(e.to_string()))?;
                let score: f64 = value
                    .parse()
                    .map_err(|_| invalid(format!("malformed score value: {}", value)))?;
                let concern = concerns.iter().any(|c| c == name);
                dimensions.push(DimensionScore {
                    dimension,
                    score,
                    concern,
                });
            }
            let verdict = node
                .reviews
                .record_automated_score(submission_id, dimensions, Utc::now())
                .await?;
            let auto = verdict.automated.as_ref();
            Ok(json!({
                "submission_id": submission_id,
                "weighted_score": auto.map(|a| a.weighted_score),
                "has_open_concern": auto.map(|a| a.has_open_concern),
                "auto_merge_eligible": verdict.is_eligible_for_auto_merge(),
            }))
        }

        Commands::RecordReview {
            submission_id,
            reviewer,
            verdict,
            category,
        } => {
            let reviewer = WalletAddress::from_string(&reviewer)?;
            let community_verdict = match verdict.to_lowercase().as_str() {
                "approve" => CommunityVerdict::Approve,
                "flag" => CommunityVerdict::Flag,
                other => return Err(invalid(format!("unknown verdict: {}", other))),
            };
            let verdict = node
                .reviews
                .record_community_review(
                    submission_id,
                    reviewer,
                    community_verdict,
                    &category,
                    Utc::now(),
                )
                .await?;
            Ok(json!({
                "submission_id": submission_id,
                "community_reviews": verdict.community.len(),
            }))
        }

        Commands::RecordDecision {
            submission_id,
            decision,
        } => {
            let decision = match decision.to_lowercase().as_str() {
                "approve" => HumanDecision::Approve,
                "reject" => HumanDecision::Reject,
                "request-changes" => HumanDecision::RequestChanges,
                other => return Err(invalid(format!("unknown decision: {}", other))),
            };
            let verdict = node
                .reviews
                .record_human_decision(submission_id, decision, Utc::now())
                .await?;
            Ok(json!({
                "submission_id": submission_id,
                "decision": verdict.human.map(|d| d.to_string()),
            }))
        }

        Commands::Settle {
            claim_id,
            disposition,
            stake_return_fraction,
        } => {
            let disposition = parse_disposition(&disposition, stake_return_fraction)
                .map_err(|e| invalid(e.to_string()))?;
            let record = node.engine.settle(claim_id, disposition, Utc::now()).await?;
            Ok(json!({
                "claim_id": record.claim_id,
                "disposition": record.disposition.to_string(),
                "stake_return": record.stake_return.to_watt(),
                "payout": record.payout.to_watt(),
                "tx_refs": record.tx_refs,
            }))
        }

        Commands::Sweep => {
            let swept = node.claims.sweep_expired(Utc::now()).await?;
            Ok(json!({
                "expired_claims": swept.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            }))
        }
    }
}
