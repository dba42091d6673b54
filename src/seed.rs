//! Demo lab data: embedded CSV fixtures replayed through the store.
//!
//! `projects.csv` lists `project,tag,color` rows; `daily_logs.csv` lists
//! `project,date,tags,note` rows with `;`-separated tag names. Projects and
//! tags are matched by name, so replaying the fixtures twice adds nothing.

use crate::actions::{normalize_name, same_name};
use crate::errors::AppResult;
use crate::selectors;
use crate::store::Store;
use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;

const PROJECTS_CSV: &str = include_str!("seed/projects.csv");
const DAILY_LOGS_CSV: &str = include_str!("seed/daily_logs.csv");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub projects: usize,
    pub tags: usize,
    pub daily_logs: usize,
}

pub fn seed_demo_projects(store: &mut Store) -> AppResult<SeedSummary> {
    seed_from_csv(store, PROJECTS_CSV, DAILY_LOGS_CSV)
}

pub fn seed_from_csv(store: &mut Store, projects_csv: &str, daily_logs_csv: &str) -> AppResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    for (line, row) in rows(projects_csv, "projects.csv", 3)? {
        let (project, tag, color) = (&row[0], &row[1], &row[2]);
        let project_id = ensure_project(store, project, &mut summary)
            .with_context(|| format!("projects.csv line {}", line))?;
        if tag.trim().is_empty() {
            return Err(anyhow!("projects.csv line {}: tag name is empty", line).into());
        }
        let color = (!color.trim().is_empty()).then_some(color.as_str());
        if store.add_lab_tag(&project_id, tag, color)?.is_some() {
            summary.tags += 1;
        }
    }

    for (line, row) in rows(daily_logs_csv, "daily_logs.csv", 4)? {
        let (project, date, tags, note) = (&row[0], &row[1], &row[2], &row[3]);
        let project_id = find_project(store, project)
            .ok_or_else(|| anyhow!("daily_logs.csv line {}: unknown project {:?}", line, project))?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .with_context(|| format!("daily_logs.csv line {}: bad date {:?}", line, date))?;
        let tag_ids = tags
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                find_tag(store, &project_id, name)
                    .ok_or_else(|| anyhow!("daily_logs.csv line {}: unknown tag {:?} in {:?}", line, name, project))
            })
            .collect::<anyhow::Result<Vec<String>>>()?;

        let before = store.get_state();
        store.set_lab_daily_log(&project_id, date, &tag_ids, note)?;
        if !std::sync::Arc::ptr_eq(&before, &store.get_state()) {
            summary.daily_logs += 1;
        }
    }

    tracing::info!(
        projects = summary.projects,
        tags = summary.tags,
        daily_logs = summary.daily_logs,
        "seeded demo lab projects"
    );
    Ok(summary)
}

fn ensure_project(store: &mut Store, name: &str, summary: &mut SeedSummary) -> anyhow::Result<String> {
    if let Some(id) = find_project(store, name) {
        return Ok(id);
    }
    let id = store
        .add_lab_project(name)?
        .ok_or_else(|| anyhow!("project name {:?} is empty", name))?;
    summary.projects += 1;
    Ok(id)
}

fn find_project(store: &Store, name: &str) -> Option<String> {
    let name = normalize_name(name)?;
    let state = store.get_state();
    let found = selectors::lab_projects(&state)
        .into_iter()
        .find(|project| same_name(&project.name, &name))
        .map(|project| project.id.clone());
    found
}

fn find_tag(store: &Store, project_id: &str, name: &str) -> Option<String> {
    let name = normalize_name(name)?;
    let state = store.get_state();
    let found = selectors::lab_tags(&state, project_id)
        .into_iter()
        .find(|tag| same_name(&tag.name, &name))
        .map(|tag| tag.id.clone());
    found
}

/// Data rows with their 1-based line numbers. The header line is skipped and
/// blank lines are ignored.
fn rows(raw: &str, file: &str, columns: usize) -> anyhow::Result<Vec<(usize, Vec<String>)>> {
    let mut parsed = Vec::new();
    for (index, text) in raw.lines().enumerate().skip(1) {
        let line = index + 1;
        if text.trim().is_empty() {
            continue;
        }
        let fields = split_fields(text).with_context(|| format!("{} line {}", file, line))?;
        if fields.len() != columns {
            bail!("{} line {}: expected {} fields, found {}", file, line, columns, fields.len());
        }
        parsed.push((line, fields));
    }
    Ok(parsed)
}

/// Comma-separated fields; double quotes protect commas and `""` is a literal
/// quote.
fn split_fields(text: &str) -> anyhow::Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match (ch, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => quoted = false,
            ('"', false) if current.is_empty() => quoted = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            (other, _) => current.push(other),
        }
    }
    if quoted {
        bail!("unterminated quoted field");
    }
    fields.push(current);
    Ok(fields)
}
