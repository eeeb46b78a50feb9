//! Sorted leaderboard and its periodic refresh job.

use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::interval};

use super::store::{InMemoryStatsStore, PlayerStats};
use crate::game::entities::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub name: String,
    pub score: i64,
    pub wins: u32,
    pub games: u32,
}

/// Sorts by score, then wins, then fewer games, then id for a stable order.
pub(crate) fn rank_players(stats: impl IntoIterator<Item = PlayerStats>) -> Vec<LeaderboardEntry> {
    let mut stats: Vec<PlayerStats> = stats.into_iter().collect();
    stats.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.wins.cmp(&a.wins))
            .then_with(|| a.games.cmp(&b.games))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    stats
        .into_iter()
        .enumerate()
        .map(|(idx, s)| LeaderboardEntry {
            rank: idx + 1,
            player_id: s.player_id,
            name: s.name,
            score: s.score,
            wins: s.wins,
            games: s.games,
        })
        .collect()
}

/// Process-wide job recomputing the leaderboard on a fixed period.
pub struct LeaderboardRefresher;

impl LeaderboardRefresher {
    /// Spawns the refresh loop. The first refresh runs immediately.
    ///
    /// The job lives for the rest of the process; the handle is only needed
    /// to stop it early.
    pub fn spawn(store: Arc<InMemoryStatsStore>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            log::info!("Leaderboard refresh every {:?}", period);
            loop {
                ticker.tick().await;
                let players = store.reload_sorted_players().await;
                log::info!("Leaderboard refreshed ({} players)", players);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(id: PlayerId, score: i64, wins: u32, games: u32) -> PlayerStats {
        PlayerStats {
            player_id: id,
            name: format!("p{id}"),
            score,
            wins,
            games,
            ..Default::default()
        }
    }

    #[test]
    fn test_rank_order() {
        let ranked = rank_players(vec![
            stats(1, 5, 2, 4),
            stats(2, 7, 1, 3),
            stats(3, 5, 3, 5),
            stats(4, 5, 3, 4),
        ]);
        let ids: Vec<_> = ranked.iter().map(|e| e.player_id).collect();
        assert_eq!(ids, vec![2, 4, 3, 1]);
        assert_eq!(ranked[3].rank, 4);
    }

    #[tokio::test]
    async fn test_refresher_runs_immediately() {
        let store = Arc::new(InMemoryStatsStore::new());
        let handle = LeaderboardRefresher::spawn(store.clone(), Duration::from_secs(3600));

        for _ in 0..50 {
            if store.refreshed_at().await.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.refreshed_at().await.is_some());
        handle.abort();
    }
}
