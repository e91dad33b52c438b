// Automatic player selection for participants with autodraft enabled.

use crate::players::Player;

/// Pick the undrafted player with the highest points per game.
///
/// Missing or non-finite `ppg` ranks as 0. Ties keep the player listed first.
pub fn select_autodraft_pick(undrafted: &[Player]) -> Option<&Player> {
    let mut best: Option<&Player> = None;
    for player in undrafted {
        match best {
            Some(current) if player.ranking_ppg() <= current.ranking_ppg() => {}
            _ => best = Some(player),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: i64, ppg: Option<f64>) -> Player {
        Player {
            id,
            name: format!("Player {id}"),
            school: "School".into(),
            position: None,
            jersey_number: None,
            year: None,
            ppg,
            rpg: None,
            apg: None,
            school_seed: None,
            region: None,
            is_active: Some(true),
        }
    }

    #[test]
    fn picks_highest_ppg() {
        let players = vec![player(1, Some(12.0)), player(2, Some(21.5)), player(3, Some(8.0))];
        assert_eq!(select_autodraft_pick(&players).unwrap().id, 2);
    }

    #[test]
    fn ties_keep_first_encountered() {
        let players = vec![player(1, Some(9.0)), player(2, Some(15.0)), player(3, Some(15.0))];
        assert_eq!(select_autodraft_pick(&players).unwrap().id, 2);
    }

    #[test]
    fn missing_ppg_ranks_as_zero() {
        let players = vec![player(1, None), player(2, Some(0.5))];
        assert_eq!(select_autodraft_pick(&players).unwrap().id, 2);

        let all_missing = vec![player(5, None), player(6, None)];
        assert_eq!(select_autodraft_pick(&all_missing).unwrap().id, 5);
    }

    #[test]
    fn empty_pool_yields_none() {
        assert!(select_autodraft_pick(&[]).is_none());
    }
}
