// Recording implementations of the display and spawn boundaries.
//
// They keep the latest value of each notification plus counters for the
// one-shot ones, so tests can assert on what a node told its presentation
// layer without a game engine. Shared with the `multiplayer_tests` crate.

use crate::boundary::{ActorSpawner, MatchDisplay};
use crate::leaderboard::LeaderboardRow;

#[derive(Clone, Debug, Default)]
pub struct RecordingDisplay {
    /// Leaderboard table rows since the last `clear_roster`.
    pub roster_rows: Vec<(String, u32, u32)>,
    pub local_stats: Option<(u32, u32)>,
    pub timer_text: Option<String>,
    pub timer_visible: bool,
    /// Standings from the most recent `show_end_screen`.
    pub end_screen: Option<Vec<LeaderboardRow>>,
    pub end_screen_visible: bool,
    pub end_screens_shown: usize,
    pub input_frozen: bool,
    pub pointer_released: usize,
    pub overview_moves: usize,
    pub scenarios_loaded: Vec<Option<String>>,
    pub returned_to_menu: usize,
}

impl MatchDisplay for RecordingDisplay {
    fn clear_roster(&mut self) {
        self.roster_rows.clear();
    }

    fn set_roster_row(&mut self, name: &str, kills: u32, deaths: u32) {
        self.roster_rows.push((name.to_owned(), kills, deaths));
    }

    fn set_local_stats(&mut self, kills: u32, deaths: u32) {
        self.local_stats = Some((kills, deaths));
    }

    fn set_timer_text(&mut self, text: &str) {
        self.timer_text = Some(text.to_owned());
    }

    fn set_timer_visible(&mut self, visible: bool) {
        self.timer_visible = visible;
    }

    fn show_end_screen(&mut self, standings: &[LeaderboardRow]) {
        self.end_screen = Some(standings.to_vec());
        self.end_screen_visible = true;
        self.end_screens_shown += 1;
    }

    fn hide_end_screen(&mut self) {
        self.end_screen_visible = false;
    }

    fn set_input_frozen(&mut self, frozen: bool) {
        self.input_frozen = frozen;
    }

    fn release_pointer(&mut self) {
        self.pointer_released += 1;
    }

    fn move_to_overview(&mut self) {
        self.overview_moves += 1;
    }

    fn load_scenario(&mut self, scenario: Option<&str>) {
        self.scenarios_loaded.push(scenario.map(str::to_owned));
    }

    fn return_to_menu(&mut self) {
        self.returned_to_menu += 1;
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingSpawner {
    pub spawned: usize,
    pub respawned: usize,
}

impl ActorSpawner for RecordingSpawner {
    fn spawn_local_actor(&mut self) {
        self.spawned += 1;
    }

    fn despawn_and_respawn(&mut self) {
        self.respawned += 1;
    }
}
