//! PostgreSQL store.
//!
//! Every statement runs under the configured [`QueryTimeouts`] so a stalled
//! connection surfaces as `StoreError::Timeout` instead of hanging a
//! manager that holds entity locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::future::Future;

use super::repository::{
    BalanceRepository, EntrantRepository, PayoutRepository, PlayerDirectory, PollRepository,
    ScoreRepository, StoreResult, VoteRepository,
};
use super::timeouts::{QueryTimeouts, TimeoutError, with_timeout};
use crate::betting::models::{
    BettingOption, BettingPoll, BettingVote, NewVote, OptionId, PollId, VoteId,
};
use crate::ledger::models::PlayerBalance;
use crate::players::{Player, PlayerId, normalize_code};
use crate::tournament::models::{
    Entrant, EntrantId, NewEntrant, PayoutPlace, ScoreRecord, TournamentId,
};

const SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

const ENTRANT_COLUMNS: &str = "id, tournament_id, player_id, full_name, buy_in_amount, rebuy_count, \
     addon_count, tier, is_confirmed, eliminated_at, placement, registered_at";

const VOTE_COLUMNS: &str = "id, poll_id, player_id, option_id, bet_amount, winnings, created_at";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeouts: QueryTimeouts,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeouts(pool, QueryTimeouts::default())
    }

    pub fn with_timeouts(pool: PgPool, timeouts: QueryTimeouts) -> Self {
        Self { pool, timeouts }
    }

    async fn run<F, T>(&self, future: F) -> Result<T, TimeoutError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        with_timeout(self.timeouts.query, future).await
    }

    async fn run_long<F, T>(&self, future: F) -> Result<T, TimeoutError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        with_timeout(self.timeouts.long, future).await
    }

    /// Create the schema if it does not exist
    pub async fn migrate(&self) -> StoreResult<()> {
        self.run_long(sqlx::raw_sql(SCHEMA).execute(&self.pool)).await?;
        Ok(())
    }

    async fn poll_options(&self, poll_ids: &[PollId]) -> StoreResult<Vec<BettingOption>> {
        let rows = self.run(
            sqlx::query(
                "SELECT id, poll_id, option_text, display_order FROM betting_options
                 WHERE poll_id = ANY($1) ORDER BY display_order, id",
            )
            .bind(poll_ids)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .iter()
            .map(|r| BettingOption {
                id: r.get("id"),
                poll_id: r.get("poll_id"),
                text: r.get("option_text"),
                display_order: r.get("display_order"),
            })
            .collect())
    }

    async fn polls_with_options(&self, rows: Vec<PgRow>) -> StoreResult<Vec<BettingPoll>> {
        let ids: Vec<PollId> = rows.iter().map(|r| r.get("id")).collect();
        let options = self.poll_options(&ids).await?;

        Ok(rows
            .iter()
            .map(|r| {
                let id: PollId = r.get("id");
                BettingPoll {
                    id,
                    tournament_id: r.get("tournament_id"),
                    title: r.get("title"),
                    options: options.iter().filter(|o| o.poll_id == id).cloned().collect(),
                    is_active: r.get("is_active"),
                    resolved_at: r.get("resolved_at"),
                    winning_option_id: r.get("winning_option_id"),
                    created_at: r.get("created_at"),
                }
            })
            .collect())
    }
}

fn count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn entrant_from_row(r: &PgRow) -> Entrant {
    let tier: String = r.get("tier");
    let placement: Option<i32> = r.get("placement");
    Entrant {
        id: r.get("id"),
        tournament_id: r.get("tournament_id"),
        player_id: r.get("player_id"),
        full_name: r.get("full_name"),
        buy_in_amount: r.get("buy_in_amount"),
        rebuy_count: count(r.get("rebuy_count")),
        addon_count: count(r.get("addon_count")),
        tier: tier.parse().unwrap_or_default(),
        confirmed: r.get("is_confirmed"),
        eliminated_at: r.get("eliminated_at"),
        placement: placement.map(count),
        registered_at: r.get("registered_at"),
    }
}

fn score_from_row(r: &PgRow) -> ScoreRecord {
    ScoreRecord {
        tournament_id: r.get("tournament_id"),
        player_id: r.get("player_id"),
        player_name: r.get("player_name"),
        placement: count(r.get("placement")),
        points: r.get("points"),
        earnings: r.get("earnings"),
        rebuy_count: count(r.get("rebuy_count")),
        addon_count: count(r.get("addon_count")),
        recorded_at: r.get("recorded_at"),
    }
}

fn vote_from_row(r: &PgRow) -> BettingVote {
    BettingVote {
        id: r.get("id"),
        poll_id: r.get("poll_id"),
        player_id: r.get("player_id"),
        option_id: r.get("option_id"),
        bet_amount: r.get("bet_amount"),
        winnings: r.get("winnings"),
        created_at: r.get("created_at"),
    }
}

fn balance_from_row(r: &PgRow) -> PlayerBalance {
    PlayerBalance {
        player_id: r.get("player_id"),
        tournament_id: r.get("tournament_id"),
        balance: r.get("balance"),
        starting_balance: r.get("starting_balance"),
        updated_at: r.get("updated_at"),
    }
}

fn player_from_row(r: &PgRow) -> Player {
    Player {
        id: r.get("id"),
        name: r.get("name"),
        betting_code: r.get("betting_code"),
    }
}

#[async_trait]
impl EntrantRepository for PgStore {
    async fn insert_entrant(&self, entrant: &NewEntrant) -> StoreResult<Entrant> {
        let query = format!(
            "INSERT INTO registrations
                (tournament_id, player_id, full_name, buy_in_amount, rebuy_count, addon_count, tier, is_confirmed)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {ENTRANT_COLUMNS}"
        );
        let row = self.run(
            sqlx::query(&query)
                .bind(entrant.tournament_id)
                .bind(entrant.player_id)
                .bind(&entrant.full_name)
                .bind(entrant.buy_in_amount)
                .bind(entrant.rebuy_count as i32)
                .bind(entrant.addon_count as i32)
                .bind(entrant.tier.as_str())
                .bind(entrant.confirmed)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(entrant_from_row(&row))
    }

    async fn get_entrant(&self, entrant_id: EntrantId) -> StoreResult<Option<Entrant>> {
        let query = format!("SELECT {ENTRANT_COLUMNS} FROM registrations WHERE id = $1");
        let row = self.run(
            sqlx::query(&query)
                .bind(entrant_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(entrant_from_row))
    }

    async fn list_entrants(&self, tournament_id: TournamentId) -> StoreResult<Vec<Entrant>> {
        let query = format!(
            "SELECT {ENTRANT_COLUMNS} FROM registrations WHERE tournament_id = $1 ORDER BY id"
        );
        let rows = self.run(
            sqlx::query(&query)
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(entrant_from_row).collect())
    }

    async fn save_entrant(&self, entrant: &Entrant) -> StoreResult<()> {
        self.run(
            sqlx::query(
                "UPDATE registrations
                 SET full_name = $2, player_id = $3, buy_in_amount = $4, rebuy_count = $5,
                     addon_count = $6, tier = $7, is_confirmed = $8
                 WHERE id = $1",
            )
            .bind(entrant.id)
            .bind(&entrant.full_name)
            .bind(entrant.player_id)
            .bind(entrant.buy_in_amount)
            .bind(entrant.rebuy_count as i32)
            .bind(entrant.addon_count as i32)
            .bind(entrant.tier.as_str())
            .bind(entrant.confirmed)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn set_elimination(
        &self,
        entrant_id: EntrantId,
        eliminated_at: Option<DateTime<Utc>>,
        placement: Option<u32>,
    ) -> StoreResult<()> {
        self.run(
            sqlx::query("UPDATE registrations SET eliminated_at = $2, placement = $3 WHERE id = $1")
                .bind(entrant_id)
                .bind(eliminated_at)
                .bind(placement.map(|p| p as i32))
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ScoreRepository for PgStore {
    async fn upsert_score(&self, record: &ScoreRecord) -> StoreResult<()> {
        self.run(
            sqlx::query(
                "INSERT INTO tournament_results
                    (tournament_id, player_id, player_name, placement, points, earnings,
                     rebuy_count, addon_count, recorded_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (tournament_id, player_id) DO UPDATE SET
                    player_name = EXCLUDED.player_name,
                    placement = EXCLUDED.placement,
                    points = EXCLUDED.points,
                    earnings = EXCLUDED.earnings,
                    rebuy_count = EXCLUDED.rebuy_count,
                    addon_count = EXCLUDED.addon_count,
                    recorded_at = EXCLUDED.recorded_at",
            )
            .bind(record.tournament_id)
            .bind(record.player_id)
            .bind(&record.player_name)
            .bind(record.placement as i32)
            .bind(record.points)
            .bind(record.earnings)
            .bind(record.rebuy_count as i32)
            .bind(record.addon_count as i32)
            .bind(record.recorded_at)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn delete_score(&self, tournament_id: TournamentId, player_id: PlayerId) -> StoreResult<bool> {
        let result = self.run(
            sqlx::query("DELETE FROM tournament_results WHERE tournament_id = $1 AND player_id = $2")
                .bind(tournament_id)
                .bind(player_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_scores(&self) -> StoreResult<Vec<ScoreRecord>> {
        let rows = self.run_long(
            sqlx::query("SELECT * FROM tournament_results ORDER BY tournament_id, player_id")
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(score_from_row).collect())
    }

    async fn tournament_scores(&self, tournament_id: TournamentId) -> StoreResult<Vec<ScoreRecord>> {
        let rows = self.run(
            sqlx::query("SELECT * FROM tournament_results WHERE tournament_id = $1 ORDER BY placement")
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(score_from_row).collect())
    }
}

#[async_trait]
impl PayoutRepository for PgStore {
    async fn set_payout_structure(
        &self,
        tournament_id: TournamentId,
        places: &[PayoutPlace],
    ) -> StoreResult<()> {
        let places = serde_json::to_value(places)?;
        self.run(
            sqlx::query(
                "INSERT INTO payout_structures (tournament_id, places) VALUES ($1, $2)
                 ON CONFLICT (tournament_id) DO UPDATE SET places = EXCLUDED.places",
            )
            .bind(tournament_id)
            .bind(places)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn payout_structure(&self, tournament_id: TournamentId) -> StoreResult<Vec<PayoutPlace>> {
        let row = self.run(
            sqlx::query("SELECT places FROM payout_structures WHERE tournament_id = $1")
                .bind(tournament_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(r) => Ok(serde_json::from_value(r.get("places"))?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl PollRepository for PgStore {
    async fn insert_poll(
        &self,
        tournament_id: TournamentId,
        title: &str,
        options: &[String],
    ) -> StoreResult<BettingPoll> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO betting_polls (tournament_id, title) VALUES ($1, $2)
             RETURNING id, tournament_id, title, is_active, resolved_at, winning_option_id, created_at",
        )
        .bind(tournament_id)
        .bind(title)
        .fetch_one(&mut *tx)
        .await?;
        let poll_id: PollId = row.get("id");

        let mut poll_options = Vec::with_capacity(options.len());
        for (order, text) in options.iter().enumerate() {
            let option_row = sqlx::query(
                "INSERT INTO betting_options (poll_id, option_text, display_order)
                 VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(poll_id)
            .bind(text)
            .bind(order as i32)
            .fetch_one(&mut *tx)
            .await?;

            poll_options.push(BettingOption {
                id: option_row.get("id"),
                poll_id,
                text: text.clone(),
                display_order: order as i32,
            });
        }

        tx.commit().await?;

        Ok(BettingPoll {
            id: poll_id,
            tournament_id,
            title: row.get("title"),
            options: poll_options,
            is_active: row.get("is_active"),
            resolved_at: row.get("resolved_at"),
            winning_option_id: row.get("winning_option_id"),
            created_at: row.get("created_at"),
        })
    }

    async fn get_poll(&self, poll_id: PollId) -> StoreResult<Option<BettingPoll>> {
        let rows = self.run(
            sqlx::query("SELECT * FROM betting_polls WHERE id = $1")
                .bind(poll_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(self.polls_with_options(rows).await?.into_iter().next())
    }

    async fn list_polls(&self, tournament_id: TournamentId) -> StoreResult<Vec<BettingPoll>> {
        let rows = self.run(
            sqlx::query("SELECT * FROM betting_polls WHERE tournament_id = $1 ORDER BY created_at DESC, id DESC")
                .bind(tournament_id)
                .fetch_all(&self.pool),
        )
        .await?;

        self.polls_with_options(rows).await
    }

    async fn set_poll_active(&self, poll_id: PollId, active: bool) -> StoreResult<bool> {
        let result = self.run(
            sqlx::query("UPDATE betting_polls SET is_active = $2 WHERE id = $1 AND resolved_at IS NULL")
                .bind(poll_id)
                .bind(active)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_resolved(
        &self,
        poll_id: PollId,
        winning_option_id: OptionId,
        resolved_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = self.run(
            sqlx::query(
                "UPDATE betting_polls
                 SET is_active = FALSE, resolved_at = $2, winning_option_id = $3
                 WHERE id = $1 AND resolved_at IS NULL",
            )
            .bind(poll_id)
            .bind(resolved_at)
            .bind(winning_option_id)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_poll(&self, poll_id: PollId) -> StoreResult<bool> {
        let result = self.run(
            sqlx::query("DELETE FROM betting_polls WHERE id = $1 AND resolved_at IS NULL")
                .bind(poll_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VoteRepository for PgStore {
    async fn insert_vote(&self, vote: &NewVote) -> StoreResult<BettingVote> {
        let query = format!(
            "INSERT INTO betting_votes (poll_id, player_id, option_id, bet_amount)
             VALUES ($1, $2, $3, $4) RETURNING {VOTE_COLUMNS}"
        );
        let row = self.run(
            sqlx::query(&query)
                .bind(vote.poll_id)
                .bind(vote.player_id)
                .bind(vote.option_id)
                .bind(vote.bet_amount)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(vote_from_row(&row))
    }

    async fn find_vote(&self, poll_id: PollId, player_id: PlayerId) -> StoreResult<Option<BettingVote>> {
        let query = format!(
            "SELECT {VOTE_COLUMNS} FROM betting_votes WHERE poll_id = $1 AND player_id = $2"
        );
        let row = self.run(
            sqlx::query(&query)
                .bind(poll_id)
                .bind(player_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(vote_from_row))
    }

    async fn poll_votes(&self, poll_id: PollId) -> StoreResult<Vec<BettingVote>> {
        let query = format!("SELECT {VOTE_COLUMNS} FROM betting_votes WHERE poll_id = $1 ORDER BY id");
        let rows = self.run(
            sqlx::query(&query).bind(poll_id).fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(vote_from_row).collect())
    }

    async fn player_votes(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<BettingVote>> {
        let rows = self.run(
            sqlx::query(
                "SELECT v.id, v.poll_id, v.player_id, v.option_id, v.bet_amount, v.winnings, v.created_at
                 FROM betting_votes v
                 JOIN betting_polls p ON p.id = v.poll_id
                 WHERE v.player_id = $1 AND p.tournament_id = $2
                 ORDER BY v.id DESC",
            )
            .bind(player_id)
            .bind(tournament_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(vote_from_row).collect())
    }

    async fn set_winnings(&self, vote_id: VoteId, winnings: i64) -> StoreResult<()> {
        self.run(
            sqlx::query("UPDATE betting_votes SET winnings = $2 WHERE id = $1")
                .bind(vote_id)
                .bind(winnings)
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn active_bet_total(&self, player_id: PlayerId, tournament_id: TournamentId) -> StoreResult<i64> {
        let row = self.run(
            sqlx::query(
                "SELECT COALESCE(SUM(v.bet_amount), 0)::BIGINT AS total
                 FROM betting_votes v
                 JOIN betting_polls p ON p.id = v.poll_id
                 WHERE v.player_id = $1 AND p.tournament_id = $2 AND p.resolved_at IS NULL",
            )
            .bind(player_id)
            .bind(tournament_id)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.get("total"))
    }
}

#[async_trait]
impl BalanceRepository for PgStore {
    async fn create_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        starting_balance: i64,
    ) -> StoreResult<PlayerBalance> {
        let row = self.run(
            sqlx::query(
                "INSERT INTO lpc_bucks_balances (player_id, tournament_id, balance, starting_balance)
                 VALUES ($1, $2, $3, $3)
                 RETURNING player_id, tournament_id, balance, starting_balance, updated_at",
            )
            .bind(player_id)
            .bind(tournament_id)
            .bind(starting_balance)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(balance_from_row(&row))
    }

    async fn get_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
    ) -> StoreResult<Option<PlayerBalance>> {
        let row = self.run(
            sqlx::query(
                "SELECT player_id, tournament_id, balance, starting_balance, updated_at
                 FROM lpc_bucks_balances WHERE player_id = $1 AND tournament_id = $2",
            )
            .bind(player_id)
            .bind(tournament_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(balance_from_row))
    }

    async fn adjust_balance(
        &self,
        player_id: PlayerId,
        tournament_id: TournamentId,
        delta: i64,
    ) -> StoreResult<Option<i64>> {
        let row = self.run(
            sqlx::query(
                "UPDATE lpc_bucks_balances SET balance = balance + $3, updated_at = NOW()
                 WHERE player_id = $1 AND tournament_id = $2
                 RETURNING balance",
            )
            .bind(player_id)
            .bind(tournament_id)
            .bind(delta)
            .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(|r| r.get("balance")))
    }
}

#[async_trait]
impl PlayerDirectory for PgStore {
    async fn create_player(&self, name: &str, betting_code: Option<&str>) -> StoreResult<Player> {
        let code = betting_code.map(normalize_code).filter(|c| !c.is_empty());
        let row = self.run(
            sqlx::query(
                "INSERT INTO players (name, betting_code) VALUES ($1, $2)
                 RETURNING id, name, betting_code",
            )
            .bind(name)
            .bind(code)
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(player_from_row(&row))
    }

    async fn find_player(&self, player_id: PlayerId) -> StoreResult<Option<Player>> {
        let row = self.run(
            sqlx::query("SELECT id, name, betting_code FROM players WHERE id = $1")
                .bind(player_id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(player_from_row))
    }

    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Player>> {
        let row = self.run(
            sqlx::query("SELECT id, name, betting_code FROM players WHERE betting_code = $1")
                .bind(normalize_code(code))
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(player_from_row))
    }
}
