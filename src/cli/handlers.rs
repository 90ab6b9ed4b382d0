use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use super::commands::{ProfileArgs, SubmitEntity};
use crate::asset::{
    AssetKind, AssetRecord, Comment, InfoCategory, Information, Label, LocaleData, Producer,
    Product, Rating, Reviewable, Source,
};
use crate::cache::ScoreIndex;
use crate::config::GovernanceConfig;
use crate::engine::Engine;
use crate::error::{GovernanceError, Rejection, Result};
use crate::review::{RejectReason, ReviewDecision, Verdict};
use crate::storage::{AssetStore, LoroStore};
use crate::user::{ProfileUpdate, User};
use crate::voting::{FlagReason, VoteKind};

/// Outcome of a command. Failures carry the asset's current record when
/// there is one.
pub type CliResult = std::result::Result<(), Rejection>;

/// Find the project root by looking for .viridian/ or .git/
fn find_project_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(".viridian").exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

fn open_engine() -> Result<Engine<LoroStore>> {
    let root = find_project_root();
    let store = LoroStore::open(&root)?;
    let config = GovernanceConfig::load(store.data_dir())?;
    Ok(Engine::new(store, config))
}

fn open_index(engine: &Engine<LoroStore>) -> Result<ScoreIndex> {
    let store = engine.store();
    let mut index = ScoreIndex::open(store.data_dir())?;
    if index.sync_from_store(store, &store.version_hash())? {
        tracing::debug!(path = %index.path().display(), "score index refreshed");
    }
    Ok(index)
}

/// The acting user, registering a profile on first use.
fn actor(engine: &Engine<LoroStore>, actor: Option<String>) -> Result<Option<String>> {
    let Some(id) = actor.or_else(get_git_author) else {
        return Ok(None);
    };
    if engine.store().get_user(&id)?.is_none() {
        engine.register_user(&User::person(id.clone(), id.clone()))?;
    }
    Ok(Some(id))
}

fn require_actor(engine: &Engine<LoroStore>, user: Option<String>) -> Result<String> {
    actor(engine, user)?.ok_or_else(|| {
        GovernanceError::InvalidArgument("no acting user; pass --as <USER>".to_string())
    })
}

/// Resolve a full ID or a unique prefix of one.
fn resolve_id(engine: &Engine<LoroStore>, id: &str) -> Result<String> {
    if engine.store().get(id)?.is_some() {
        return Ok(id.to_string());
    }
    if id.is_empty() {
        return Err(GovernanceError::AssetNotFound(id.to_string()));
    }

    let matches: Vec<String> = engine
        .store()
        .list()?
        .iter()
        .map(|r| r.id())
        .filter(|candidate| candidate.starts_with(id))
        .map(str::to_string)
        .collect();

    match matches.as_slice() {
        [one] => Ok(one.clone()),
        [] => Err(GovernanceError::AssetNotFound(id.to_string())),
        _ => Err(GovernanceError::AssetNotFound(format!(
            "{} (ambiguous, {} matches)",
            id,
            matches.len()
        ))),
    }
}

fn parse<T: FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(GovernanceError::InvalidArgument)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_record(verb: &str, record: &AssetRecord, json: bool) -> Result<()> {
    if json {
        print_json(record)?;
    } else {
        println!(
            "{} {} {} [{}] - {}",
            verb,
            record.kind(),
            short_id(record.id()),
            record.status(),
            record.title()
        );
    }
    Ok(())
}

pub fn handle_init() -> CliResult {
    let root = env::current_dir().map_err(GovernanceError::from)?;

    let store = LoroStore::init(&root)?;
    GovernanceConfig::default().save(store.data_dir())?;

    println!("Initialized viridian project in {}", root.display());
    Ok(())
}

pub fn handle_submit(entity: SubmitEntity, user: Option<String>) -> CliResult {
    let engine = open_engine()?;
    let submitter = actor(&engine, user)?;

    let (record, json): (AssetRecord, bool) = match entity {
        SubmitEntity::Product {
            gtin,
            name,
            locale,
            producer,
            labels,
            json,
        } => {
            let mut product = Product::new(gtin, submitter);
            if let Some(name) = name {
                product.set_locale(LocaleData::new(locale, name));
            }
            product.producer_id = producer
                .map(|p| resolve_id(&engine, &p))
                .transpose()?;
            product.label_ids = labels
                .iter()
                .map(|l| resolve_id(&engine, l))
                .collect::<Result<_>>()?;
            (product.into(), json)
        }
        SubmitEntity::Producer {
            name,
            address,
            url,
            json,
        } => {
            let mut producer = Producer::new(name, submitter);
            producer.address = address;
            producer.url = url;
            (producer.into(), json)
        }
        SubmitEntity::Label {
            label_version,
            name,
            locale,
            json,
        } => {
            let mut label = Label::new(label_version, submitter);
            if let Some(name) = name {
                label.set_locale(LocaleData::new(locale, name));
            }
            (label.into(), json)
        }
        SubmitEntity::Info {
            target,
            title,
            category,
            description,
            sources,
            weight,
            json,
        } => {
            let target = resolve_id(&engine, &target)?;
            let category: InfoCategory = parse(&category)?;
            let mut info = Information::new(target, title, category, weight, submitter);
            info.description = description;
            info.sources = sources
                .into_iter()
                .map(|url| Source {
                    url,
                    title: None,
                    retrieved_at: None,
                })
                .collect();
            (info.into(), json)
        }
        SubmitEntity::Comment {
            target,
            text,
            weight,
            json,
        } => {
            let target = resolve_id(&engine, &target)?;
            (Comment::new(target, text, weight, submitter).into(), json)
        }
    };

    let stored = engine.submit(record)?;
    engine.store().save()?;
    print_record("Submitted", &stored, json)?;
    Ok(())
}

pub fn handle_rate(
    target: String,
    score: f64,
    weight: i32,
    json: bool,
    user: Option<String>,
) -> CliResult {
    let engine = open_engine()?;
    let submitter = actor(&engine, user)?;
    let target = resolve_id(&engine, &target)?;

    let rating = Rating::new(target.clone(), score, weight, submitter);
    let stored = engine
        .submit(rating.into())
        .map_err(|e| engine.reject(e, &target))?;
    engine.store().save()?;
    print_record("Submitted", &stored, json)?;
    Ok(())
}

pub fn handle_review(
    id: String,
    decision: String,
    reason: Option<String>,
    comment: Option<String>,
    json: bool,
    user: Option<String>,
) -> CliResult {
    let engine = open_engine()?;
    let reviewer = actor(&engine, user)?;
    let id = resolve_id(&engine, &id)?;

    let verdict = Verdict {
        decision: parse::<ReviewDecision>(&decision)?,
        reject_reason: reason.as_deref().map(parse::<RejectReason>).transpose()?,
        comment,
        reviewer,
    };

    let review = engine
        .submit_review(&id, verdict)
        .map_err(|e| engine.reject(e, &id))?;
    engine.store().save()?;

    if json {
        print_json(&review)?;
    } else {
        let record = engine.get(&id)?;
        println!(
            "Review {} of {} {}: now {}",
            review.decision,
            record.kind(),
            short_id(&id),
            record.status()
        );
    }
    Ok(())
}

pub fn handle_delete(id: String, json: bool, user: Option<String>) -> CliResult {
    let engine = open_engine()?;
    let who = actor(&engine, user)?;
    let id = resolve_id(&engine, &id)?;

    let deleted = engine
        .delete(&id, who.as_deref())
        .map_err(|e| engine.reject(e, &id))?;
    engine.store().save()?;
    print_record("Deleted", &deleted, json)?;
    Ok(())
}

/// Put `name` and `description` on the first locale, creating an "en" one if needed.
fn edit_locales(
    locales: &mut Vec<LocaleData>,
    name: Option<String>,
    description: Option<String>,
) {
    if name.is_none() && description.is_none() {
        return;
    }
    if locales.is_empty() {
        locales.push(LocaleData::new("en".to_string(), String::new()));
    }
    if let Some(first) = locales.first_mut() {
        if let Some(name) = name {
            first.name = name;
        }
        if description.is_some() {
            first.description = description;
        }
    }
}

pub fn handle_revise(
    id: String,
    title: Option<String>,
    name: Option<String>,
    description: Option<String>,
    change_reason: Option<String>,
    json: bool,
    user: Option<String>,
) -> CliResult {
    let engine = open_engine()?;
    let submitter = actor(&engine, user)?;
    let id = resolve_id(&engine, &id)?;

    let mut replacement = engine.get(&id)?;
    match &mut replacement {
        AssetRecord::Product(p) => edit_locales(&mut p.locales, name, description),
        AssetRecord::Producer(p) => {
            if let Some(name) = name.clone() {
                p.name = name;
            }
            edit_locales(&mut p.locales, name, description);
        }
        AssetRecord::Label(l) => edit_locales(&mut l.locales, name, description),
        AssetRecord::Information(info) => {
            if let Some(title) = title {
                info.title = title;
            }
            if description.is_some() {
                info.description = description;
            }
        }
        AssetRecord::Comment(_) | AssetRecord::Rating(_) => {}
    }
    if submitter.is_some() {
        replacement.envelope_mut().submitted_by = submitter;
    }

    let new = engine
        .revise(&id, replacement, change_reason)
        .map_err(|e| engine.reject(e, &id))?;
    engine.store().save()?;
    print_record("Revised", &new, json)?;
    Ok(())
}

pub fn handle_vote(target: String, value: i32, json: bool, user: Option<String>) -> CliResult {
    let engine = open_engine()?;
    let voter = require_actor(&engine, user)?;
    let target = resolve_id(&engine, &target)?;

    let record = engine.get(&target)?;
    let kind = VoteKind::for_kind(record.kind()).ok_or_else(|| {
        GovernanceError::invalid_target(
            &target,
            &[AssetKind::Rating, AssetKind::Information, AssetKind::Comment],
        )
    })?;

    let vote = engine
        .cast_vote(&voter, &target, kind, value)
        .map_err(|e| engine.reject(e, &target))?;
    engine.store().save()?;

    if json {
        print_json(&vote)?;
    } else {
        println!(
            "Voted {:+} on {} {} (net {})",
            vote.value,
            kind,
            short_id(&target),
            engine.net_votes(&target)?
        );
    }
    Ok(())
}

pub fn handle_flag(id: String, reason: String, json: bool) -> CliResult {
    let engine = open_engine()?;
    let id = resolve_id(&engine, &id)?;
    let reason: FlagReason = parse(&reason)?;

    let flag = engine.flag(&id, reason).map_err(|e| engine.reject(e, &id))?;
    engine.store().save()?;

    if json {
        print_json(&flag)?;
    } else {
        let record = engine.get(&id)?;
        println!(
            "Flagged comment {} as {} ({} pending, now {})",
            short_id(&id),
            reason,
            flag.pending(),
            record.status()
        );
    }
    Ok(())
}

pub fn handle_show(id: String, json: bool) -> CliResult {
    let engine = open_engine()?;
    let id = resolve_id(&engine, &id)?;
    let record = engine.get(&id)?;
    let reviews = engine.reviews(&id)?;

    if json {
        let value = serde_json::json!({ "asset": record, "reviews": reviews });
        print_json(&value)?;
        return Ok(());
    }

    println!("{} {}", record.kind(), record.id());
    println!("Title: {}", record.title());
    println!("Status: {}", record.status());
    println!(
        "Created: {}",
        record.envelope().created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(author) = record.submitted_by() {
        println!("Submitted by: {}", author);
    }
    if let Some(target) = record.target_id() {
        println!("Target: {}", target);
    }
    if let Some(revision) = record.revision() {
        println!("Updated: {}", revision.updated_at.format("%Y-%m-%d %H:%M"));
        if let Some(ref supersedes) = revision.supersedes {
            println!("Supersedes: {}", supersedes);
        }
    }
    if let Some(score) = record.score() {
        println!(
            "Score: {:.1} ({} ratings, weight {})",
            score.value, score.rating_count, score.total_weight
        );
    }
    if let AssetRecord::Comment(comment) = &record {
        if comment.flag.total() > 0 {
            println!(
                "Flags: {} ({} pending)",
                comment.flag.total(),
                comment.flag.pending()
            );
        }
    }

    if !reviews.is_empty() {
        println!("\nReviews:");
        for r in &reviews {
            let mut line = format!(
                "  {} {} requested {}",
                short_id(&r.id),
                r.decision,
                r.requested_at.format("%Y-%m-%d %H:%M")
            );
            if let Some(ref reviewer) = r.reviewer {
                line.push_str(&format!(" by {}", reviewer));
            }
            if let Some(reason) = r.reject_reason {
                line.push_str(&format!(" ({})", reason));
            }
            println!("{}", line);
            if let Some(ref comment) = r.reason_comment {
                println!("      {}", comment);
            }
        }
    }
    Ok(())
}

pub fn handle_score(id: String, recompute: bool, json: bool) -> CliResult {
    let engine = open_engine()?;
    let id = resolve_id(&engine, &id)?;

    let score = if recompute {
        let score = engine.recompute(&id).map_err(|e| engine.reject(e, &id))?;
        engine.store().save()?;
        score
    } else {
        match engine.score(&id) {
            Ok(score) => Some(score),
            Err(GovernanceError::NoContributingRatings(_)) => None,
            Err(e) => return Err(engine.reject(e, &id)),
        }
    };

    if json {
        print_json(&score)?;
    } else {
        match score {
            Some(s) => println!(
                "{}: {:.1} ({} ratings, weight {})",
                short_id(&id),
                s.value,
                s.rating_count,
                s.total_weight
            ),
            None => println!("{}: unscored", short_id(&id)),
        }
    }
    Ok(())
}

pub fn handle_queue(json: bool) -> CliResult {
    let engine = open_engine()?;
    let index = open_index(&engine)?;
    let queue = index.pending_reviews()?;

    if json {
        let rows: Vec<_> = queue
            .iter()
            .map(|q| {
                serde_json::json!({
                    "review_id": q.review_id,
                    "asset_id": q.asset_id,
                    "kind": q.kind,
                    "title": q.title,
                    "requested_at": q.requested_at,
                })
            })
            .collect();
        print_json(&rows)?;
    } else if queue.is_empty() {
        println!("No pending reviews.");
    } else {
        println!("Pending reviews:\n");
        for q in &queue {
            println!("  {} {} - {}", short_id(&q.asset_id), q.kind, q.title);
        }
    }
    Ok(())
}

pub fn handle_leaderboard(kind: String, limit: usize, json: bool) -> CliResult {
    let kind: AssetKind = parse(&kind)?;
    if !kind.is_scorable() {
        return Err(GovernanceError::InvalidArgument(format!("{} assets have no score", kind)).into());
    }

    let engine = open_engine()?;
    let index = open_index(&engine)?;
    let ranked = index.leaderboard(kind, limit)?;

    if json {
        let rows: Vec<_> = ranked
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "kind": r.kind,
                    "title": r.title,
                    "score": r.score,
                    "total_weight": r.total_weight,
                    "rating_count": r.rating_count,
                })
            })
            .collect();
        print_json(&rows)?;
    } else if ranked.is_empty() {
        println!("No scored {}s yet.", kind);
    } else {
        for (i, r) in ranked.iter().enumerate() {
            println!(
                "  {:>2}. {:5.1}  {} {} ({} ratings)",
                i + 1,
                r.score,
                short_id(&r.id),
                r.title,
                r.rating_count
            );
        }
    }
    Ok(())
}

pub fn handle_profile(args: ProfileArgs, user: Option<String>) -> CliResult {
    let engine = open_engine()?;
    let user_id = require_actor(&engine, user)?;

    let update = ProfileUpdate {
        avatar_url: args.avatar_url,
        public_email: args.email,
        bio: args.bio,
        real_name: args.real_name,
        url: args.url,
        location: args.location,
    };
    let user = engine.update_profile(&user_id, update)?;
    engine.store().save()?;

    if args.json {
        print_json(&user)?;
    } else {
        println!("Updated profile of {} (reputation {})", user.id, user.reputation);
    }
    Ok(())
}

fn get_git_author() -> Option<String> {
    std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            } else {
                None
            }
        })
}
