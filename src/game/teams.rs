//! Team formation: shuffle the roster and cut it into near-equal teams

use rand::seq::SliceRandom;
use rand::Rng;

use super::state::{Player, Team, TeamId, TeamMember};

/// Cosmetic palette, cycled when there are more teams than entries
const TEAM_COLORS: [&str; 4] = ["#f093fb", "#4facfe", "#43e97b", "#fa709a"];
const TEAM_EMOJIS: [&str; 4] = ["🚀", "⚡", "🔥", "🌊"];

/// Sizes of `team_count` contiguous groups over `player_count` players.
/// Remainder goes to the earliest groups; empty groups are left out.
pub fn team_sizes(player_count: usize, team_count: usize) -> Vec<usize> {
    if team_count == 0 {
        return Vec::new();
    }
    let base = player_count / team_count;
    let extra = player_count % team_count;
    (0..team_count)
        .map(|i| base + usize::from(i < extra))
        .filter(|&size| size > 0)
        .collect()
}

/// Shuffle `players` uniformly and split them into teams.
///
/// Every player's `team_id` is set before returning, so a non-empty roster
/// never leaves anyone unassigned.
pub fn form_teams<R: Rng + ?Sized>(
    players: &mut [Player],
    team_count: usize,
    rng: &mut R,
) -> Vec<Team> {
    let mut order: Vec<usize> = (0..players.len()).collect();
    order.shuffle(rng);

    let mut teams = Vec::new();
    let mut cursor = 0;
    for (index, size) in team_sizes(players.len(), team_count).into_iter().enumerate() {
        let id = (index + 1) as TeamId;
        let mut team = Team::new(
            id,
            format!("Team {}", id),
            TEAM_COLORS[index % TEAM_COLORS.len()],
            TEAM_EMOJIS[index % TEAM_EMOJIS.len()],
        );

        for &player_index in &order[cursor..cursor + size] {
            let player = &mut players[player_index];
            player.team_id = Some(id);
            team.members.push(TeamMember {
                id: player.id,
                name: player.name.clone(),
            });
        }
        cursor += size;
        teams.push(team);
    }

    teams
}
