use capture_core::error::{CaptureError, Result};
use capture_core::forge::{Author, FileChange, IssueComment, PullRequest, Review, ReviewComment};
use capture_core::rollout::RepositoryCategory;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// Upserts for the `repositories`/`pull_requests`/`reviews`/`comments`
/// tables that Capture Workers write into.
///
/// Keys per spec: `pull_requests` on `(repository_id, number)`; `reviews`
/// and `comments` on `github_id`. Updating a PR never deletes its
/// children — every statement here is a plain `INSERT ... ON CONFLICT ...
/// DO UPDATE`, never a delete-then-insert.
#[derive(Clone)]
pub struct CaptureStore {
    pool: PgPool,
}

impl CaptureStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_repository(&self, repository_id: &str, repository_name: &str) -> Result<()> {
        run(
            sqlx::query(
                r#"
                INSERT INTO repositories (id, name)
                VALUES ($1, $2)
                ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
                "#,
            )
            .bind(repository_id)
            .bind(repository_name)
            .execute(&self.pool),
        )
        .await
    }

    /// The `repository_size` rollout strategy's input (spec §3 "Repository
    /// Category"). Defaults to `Test` for a repository the store has never
    /// seen or that was never assigned a category, the most conservative
    /// stage in the `test -> small -> medium -> large` ordering.
    pub async fn repository_category(&self, repository_id: &str) -> Result<RepositoryCategory> {
        let row = sqlx::query("SELECT category FROM repositories WHERE id = $1")
            .bind(repository_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        let category: Option<String> = row.and_then(|r| r.get("category"));
        Ok(match category.as_deref() {
            Some("small") => RepositoryCategory::Small,
            Some("medium") => RepositoryCategory::Medium,
            Some("large") => RepositoryCategory::Large,
            _ => RepositoryCategory::Test,
        })
    }

    pub async fn upsert_pull_request(&self, repository_id: &str, pr: &PullRequest) -> Result<()> {
        let (merged_by_id, merged_by_login, merged_by_avatar) = split_author(&pr.merged_by);

        run(
            sqlx::query(
                r#"
                INSERT INTO pull_requests (
                    repository_id, number, github_id, title, body, state, draft,
                    additions, deletions, changed_files, commit_count,
                    author_id, author_login, author_avatar,
                    merged_by_id, merged_by_login, merged_by_avatar,
                    created_at, updated_at, closed_at, merged_at,
                    merged, mergeable, base_ref, head_ref
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
                )
                ON CONFLICT (repository_id, number) DO UPDATE SET
                    github_id = EXCLUDED.github_id,
                    title = EXCLUDED.title,
                    body = EXCLUDED.body,
                    state = EXCLUDED.state,
                    draft = EXCLUDED.draft,
                    additions = EXCLUDED.additions,
                    deletions = EXCLUDED.deletions,
                    changed_files = EXCLUDED.changed_files,
                    commit_count = EXCLUDED.commit_count,
                    author_id = EXCLUDED.author_id,
                    author_login = EXCLUDED.author_login,
                    author_avatar = EXCLUDED.author_avatar,
                    merged_by_id = EXCLUDED.merged_by_id,
                    merged_by_login = EXCLUDED.merged_by_login,
                    merged_by_avatar = EXCLUDED.merged_by_avatar,
                    updated_at = EXCLUDED.updated_at,
                    closed_at = EXCLUDED.closed_at,
                    merged_at = EXCLUDED.merged_at,
                    merged = EXCLUDED.merged,
                    mergeable = EXCLUDED.mergeable,
                    base_ref = EXCLUDED.base_ref,
                    head_ref = EXCLUDED.head_ref
                "#,
            )
            .bind(repository_id)
            .bind(pr.number)
            .bind(&pr.id)
            .bind(&pr.title)
            .bind(&pr.body)
            .bind(state_str(pr.state))
            .bind(pr.draft)
            .bind(pr.additions)
            .bind(pr.deletions)
            .bind(pr.changed_files)
            .bind(pr.commit_count)
            .bind(&pr.author.id)
            .bind(&pr.author.login)
            .bind(&pr.author.avatar)
            .bind(merged_by_id)
            .bind(merged_by_login)
            .bind(merged_by_avatar)
            .bind(pr.timestamps.created)
            .bind(pr.timestamps.updated)
            .bind(pr.timestamps.closed)
            .bind(pr.timestamps.merged)
            .bind(pr.merged)
            .bind(pr.mergeable)
            .bind(&pr.base_ref)
            .bind(&pr.head_ref)
            .execute(&self.pool),
        )
        .await
    }

    pub async fn upsert_review(
        &self,
        repository_id: &str,
        pr_number: i64,
        review: &Review,
    ) -> Result<()> {
        run(
            sqlx::query(
                r#"
                INSERT INTO reviews (
                    github_id, repository_id, pr_number, state, body,
                    author_id, author_login, author_avatar, submitted_at, commit_id
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (github_id) DO UPDATE SET
                    state = EXCLUDED.state,
                    body = EXCLUDED.body,
                    author_id = EXCLUDED.author_id,
                    author_login = EXCLUDED.author_login,
                    author_avatar = EXCLUDED.author_avatar,
                    submitted_at = EXCLUDED.submitted_at,
                    commit_id = EXCLUDED.commit_id
                "#,
            )
            .bind(&review.id)
            .bind(repository_id)
            .bind(pr_number)
            .bind(&review.state)
            .bind(&review.body)
            .bind(&review.author.id)
            .bind(&review.author.login)
            .bind(&review.author.avatar)
            .bind(review.submitted_at)
            .bind(&review.commit_id)
            .execute(&self.pool),
        )
        .await
    }

    pub async fn upsert_issue_comment(
        &self,
        repository_id: &str,
        pr_number: i64,
        comment: &IssueComment,
    ) -> Result<()> {
        run(
            sqlx::query(
                r#"
                INSERT INTO comments (
                    github_id, kind, repository_id, pr_number, body,
                    author_id, author_login, author_avatar, created_at, updated_at
                ) VALUES ($1, 'issue', $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (github_id) DO UPDATE SET
                    body = EXCLUDED.body,
                    author_id = EXCLUDED.author_id,
                    author_login = EXCLUDED.author_login,
                    author_avatar = EXCLUDED.author_avatar,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(&comment.id)
            .bind(repository_id)
            .bind(pr_number)
            .bind(&comment.body)
            .bind(&comment.author.id)
            .bind(&comment.author.login)
            .bind(&comment.author.avatar)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .execute(&self.pool),
        )
        .await
    }

    pub async fn upsert_review_comment(
        &self,
        repository_id: &str,
        pr_number: i64,
        comment: &ReviewComment,
    ) -> Result<()> {
        run(
            sqlx::query(
                r#"
                INSERT INTO comments (
                    github_id, kind, repository_id, pr_number, body,
                    author_id, author_login, author_avatar, created_at, updated_at,
                    path, position, original_position, diff_hunk, in_reply_to_id, review_id
                ) VALUES ($1, 'review', $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (github_id) DO UPDATE SET
                    body = EXCLUDED.body,
                    author_id = EXCLUDED.author_id,
                    author_login = EXCLUDED.author_login,
                    author_avatar = EXCLUDED.author_avatar,
                    updated_at = EXCLUDED.updated_at,
                    path = EXCLUDED.path,
                    position = EXCLUDED.position,
                    original_position = EXCLUDED.original_position,
                    diff_hunk = EXCLUDED.diff_hunk,
                    in_reply_to_id = EXCLUDED.in_reply_to_id,
                    review_id = EXCLUDED.review_id
                "#,
            )
            .bind(&comment.id)
            .bind(repository_id)
            .bind(pr_number)
            .bind(&comment.body)
            .bind(&comment.author.id)
            .bind(&comment.author.login)
            .bind(&comment.author.avatar)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .bind(&comment.path)
            .bind(comment.position)
            .bind(comment.original_position)
            .bind(&comment.diff_hunk)
            .bind(&comment.in_reply_to_id)
            .bind(&comment.review_id)
            .execute(&self.pool),
        )
        .await
    }

    /// `FileChangesWorker`'s write path. Not one of the four tables spec
    /// §6 names explicitly, but `JobKind::FileChanges` exists and every
    /// `PullRequestComplete.files` entry needs a home; keyed on
    /// `(repository_id, pr_number, filename)` following the same
    /// natural-key upsert discipline as the rest of this store.
    pub async fn upsert_file_change(
        &self,
        repository_id: &str,
        pr_number: i64,
        file: &FileChange,
    ) -> Result<()> {
        run(
            sqlx::query(
                r#"
                INSERT INTO file_changes (
                    repository_id, pr_number, filename, additions, deletions, changes, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (repository_id, pr_number, filename) DO UPDATE SET
                    additions = EXCLUDED.additions,
                    deletions = EXCLUDED.deletions,
                    changes = EXCLUDED.changes,
                    status = EXCLUDED.status
                "#,
            )
            .bind(repository_id)
            .bind(pr_number)
            .bind(&file.filename)
            .bind(file.additions)
            .bind(file.deletions)
            .bind(file.changes)
            .bind(&file.status)
            .execute(&self.pool),
        )
        .await
    }

    /// Item discovery for a time-range Job with no explicit `prNumbers`
    /// (spec §8 boundary behavior: "An empty `PR_NUMBERS` with a
    /// non-empty time-range fetches work from the store, not from the
    /// forge directly"). Returns PR numbers updated since `since`, newest
    /// first, capped at `limit`.
    pub async fn recent_pull_request_numbers(
        &self,
        repository_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<i64>> {
        let rows = sqlx::query(
            r#"
            SELECT number FROM pull_requests
            WHERE repository_id = $1 AND updated_at >= $2
            ORDER BY updated_at DESC
            LIMIT $3
            "#,
        )
        .bind(repository_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CaptureError::StoreError(e.to_string()))?;

        Ok(rows.iter().map(|r| r.get("number")).collect())
    }
}

fn state_str(state: capture_core::forge::PullRequestState) -> &'static str {
    match state {
        capture_core::forge::PullRequestState::Open => "open",
        capture_core::forge::PullRequestState::Closed => "closed",
    }
}

fn split_author(author: &Option<Author>) -> (Option<&str>, Option<&str>, Option<&str>) {
    match author {
        Some(a) => (Some(a.id.as_str()), Some(a.login.as_str()), a.avatar.as_deref()),
        None => (None, None, None),
    }
}

/// Run an upsert, folding a unique-key violation into success per the
/// `StoreConflict` policy (§7: "treated as success, idempotent").
async fn run(
    query: impl std::future::Future<Output = std::result::Result<sqlx::postgres::PgQueryResult, sqlx::Error>>,
) -> Result<()> {
    match query.await {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Ok(()),
        Err(e) => Err(CaptureError::StoreError(e.to_string())),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
