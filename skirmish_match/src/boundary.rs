// Boundaries between the match core and the game around it.
//
// The core never renders, never moves a camera and never spawns anything
// itself. It pushes notifications through these two traits and never reads
// anything back. A game client implements them against its scene; tests use
// the recording doubles in `testing.rs`.

use crate::leaderboard::LeaderboardRow;

/// Presentation side: HUD, leaderboard, end screen, scene control.
pub trait MatchDisplay {
    /// Empty the leaderboard table before it is refilled row by row.
    fn clear_roster(&mut self);
    fn set_roster_row(&mut self, name: &str, kills: u32, deaths: u32);
    /// The local player's own counters on the HUD.
    fn set_local_stats(&mut self, kills: u32, deaths: u32);
    /// Clock text, always `mm:ss`.
    fn set_timer_text(&mut self, text: &str);
    fn set_timer_visible(&mut self, visible: bool);
    /// Show the end screen with the final standings, best first.
    fn show_end_screen(&mut self, standings: &[LeaderboardRow]);
    fn hide_end_screen(&mut self);
    fn set_input_frozen(&mut self, frozen: bool);
    fn release_pointer(&mut self);
    /// Move the observer viewpoint to the arena overview.
    fn move_to_overview(&mut self);
    /// Load a scenario for the next match. `None` reloads the current one.
    fn load_scenario(&mut self, scenario: Option<&str>);
    fn return_to_menu(&mut self);
}

/// Spawn side: the local player's in-world actor.
pub trait ActorSpawner {
    fn spawn_local_actor(&mut self);
    fn despawn_and_respawn(&mut self);
}
