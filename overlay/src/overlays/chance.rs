//! Games of chance: dice, coin flip and a spinning randomizer
//!
//! Results are written back into the instance config so they survive restarts
//! and show up on every re-render.

use perch_types::{ConfigValue, ToolConfig, ToolKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ConfigChange, OverlayContent, config_f64, config_str, panel};
use crate::frame::{Frame, colors};

const RESULT_FONT: f32 = 28.0;
const MAX_DICE: u32 = 6;
const MAX_CHOICE_CHARS: usize = 18;

pub(super) fn dice_default_config() -> ToolConfig {
    ToolConfig::new()
        .with("count", ConfigValue::Int(2))
        .with("sides", ConfigValue::Int(6))
        .with("last_roll", ConfigValue::Text(String::new()))
}

pub(super) fn coin_default_config() -> ToolConfig {
    ToolConfig::new().with("last_flip", ConfigValue::Text("heads".into()))
}

pub(super) fn randomizer_default_config() -> ToolConfig {
    ToolConfig::new()
        .with("choices", ConfigValue::Text("Red,Green,Blue".into()))
        .with("last_pick", ConfigValue::Text(String::new()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Dice
// ─────────────────────────────────────────────────────────────────────────────

pub struct DiceContent {
    rng: StdRng,
    count: u32,
    sides: u32,
    last_roll: String,
}

impl DiceContent {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic dice for tests
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            count: 2,
            sides: 6,
            last_roll: String::new(),
        }
    }
}

impl Default for DiceContent {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayContent for DiceContent {
    fn tool(&self) -> ToolKind {
        ToolKind::Dice
    }

    fn update(&mut self, config: &ToolConfig) {
        self.count = (config_f64(config, "count", 2.0) as u32).clamp(1, MAX_DICE);
        self.sides = (config_f64(config, "sides", 6.0) as u32).max(2);
        self.last_roll = config_str(config, "last_roll", "").to_string();
    }

    fn natural_size(&self) -> (u32, u32) {
        (self.count * 48 + 104, 160)
    }

    fn render(&self, size: (u32, u32)) -> Frame {
        let mut frame = panel(size);
        let text = if self.last_roll.is_empty() {
            "-".to_string()
        } else {
            self.last_roll.clone()
        };
        frame.text(40.0, 48.0, RESULT_FONT, text, colors::WHITE);
        frame
    }

    fn actions(&self) -> &'static [(&'static str, &'static str)] {
        &[("roll", "Roll")]
    }

    fn on_action(&mut self, action: &'static str) -> Vec<ConfigChange> {
        if action != "roll" {
            return Vec::new();
        }
        let faces: Vec<String> = (0..self.count)
            .map(|_| self.rng.gen_range(1..=self.sides).to_string())
            .collect();
        self.last_roll = faces.join(" ");
        vec![ConfigChange::text("last_roll", self.last_roll.clone())]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coin
// ─────────────────────────────────────────────────────────────────────────────

pub struct CoinContent {
    rng: StdRng,
    last_flip: String,
}

impl CoinContent {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            last_flip: "heads".to_string(),
        }
    }
}

impl Default for CoinContent {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayContent for CoinContent {
    fn tool(&self) -> ToolKind {
        ToolKind::Coin
    }

    fn update(&mut self, config: &ToolConfig) {
        self.last_flip = config_str(config, "last_flip", "heads").to_string();
    }

    fn natural_size(&self) -> (u32, u32) {
        (180, 180)
    }

    fn render(&self, size: (u32, u32)) -> Frame {
        let mut frame = panel(size);
        let (w, h) = (size.0 as f32, size.1 as f32);
        frame.circle(w / 2.0, h / 2.0 - 10.0, w.min(h) / 4.0, colors::AMBER);
        frame.text(w / 2.0 - 30.0, h / 2.0 - 20.0, 18.0, self.last_flip.clone(), colors::BLACK);
        frame
    }

    fn actions(&self) -> &'static [(&'static str, &'static str)] {
        &[("flip", "Flip")]
    }

    fn on_action(&mut self, action: &'static str) -> Vec<ConfigChange> {
        if action != "flip" {
            return Vec::new();
        }
        self.last_flip = if self.rng.gen_bool(0.5) { "heads" } else { "tails" }.to_string();
        vec![ConfigChange::text("last_flip", self.last_flip.clone())]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Randomizer
// ─────────────────────────────────────────────────────────────────────────────

pub struct RandomizerContent {
    rng: StdRng,
    choices: Vec<String>,
    last_pick: String,
}

impl RandomizerContent {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            choices: Vec::new(),
            last_pick: String::new(),
        }
    }
}

impl Default for RandomizerContent {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayContent for RandomizerContent {
    fn tool(&self) -> ToolKind {
        ToolKind::Randomizer
    }

    fn update(&mut self, config: &ToolConfig) {
        self.choices = config_str(config, "choices", "")
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        self.last_pick = config_str(config, "last_pick", "").to_string();
    }

    fn natural_size(&self) -> (u32, u32) {
        (280, 280)
    }

    fn render(&self, size: (u32, u32)) -> Frame {
        let mut frame = panel(size);
        let (w, h) = (size.0 as f32, size.1 as f32);
        frame.circle(w / 2.0, h / 2.0 - 14.0, w.min(h) / 2.0 - 40.0, colors::DIM);
        if !self.last_pick.is_empty() {
            frame.text(
                w / 2.0 - 50.0,
                h / 2.0 - 28.0,
                RESULT_FONT,
                wheel_label(&self.last_pick),
                colors::WHITE,
            );
        }
        frame
    }

    fn actions(&self) -> &'static [(&'static str, &'static str)] {
        &[("spin", "Spin")]
    }

    fn on_action(&mut self, action: &'static str) -> Vec<ConfigChange> {
        if action != "spin" || self.choices.is_empty() {
            return Vec::new();
        }
        let index = self.rng.gen_range(0..self.choices.len());
        self.last_pick = self.choices[index].clone();
        vec![ConfigChange::text("last_pick", self.last_pick.clone())]
    }
}

/// Fit a randomizer entry on the wheel: at most `MAX_CHOICE_CHARS`
/// characters, the last one an ellipsis when the entry is cut
fn wheel_label(entry: &str) -> String {
    if entry.chars().count() <= MAX_CHOICE_CHARS {
        return entry.to_string();
    }
    let mut label: String = entry.chars().take(MAX_CHOICE_CHARS - 1).collect();
    label.push('…');
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_produces_one_face_per_die() {
        let mut dice = DiceContent::from_seed(7);
        dice.update(&dice_default_config().with("count", ConfigValue::Int(3)));
        let changes = dice.on_action("roll");
        assert_eq!(changes.len(), 1);
        let faces: Vec<u32> = changes[0]
            .value
            .as_str()
            .unwrap()
            .split(' ')
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(faces.len(), 3);
        assert!(faces.iter().all(|f| (1..=6).contains(f)));
        assert!(dice.on_action("flip").is_empty());
    }

    #[test]
    fn dice_count_is_clamped() {
        let mut dice = DiceContent::from_seed(1);
        dice.update(&dice_default_config().with("count", ConfigValue::Int(40)));
        assert_eq!(dice.natural_size(), (6 * 48 + 104, 160));
    }

    #[test]
    fn coin_lands_on_a_side() {
        let mut coin = CoinContent::new();
        let changes = coin.on_action("flip");
        let side = changes[0].value.as_str().unwrap();
        assert!(side == "heads" || side == "tails");
        assert_eq!(coin.render((180, 180)).texts().collect::<Vec<_>>(), vec![side]);
    }

    #[test]
    fn randomizer_picks_from_choices() {
        let mut spinner = RandomizerContent::new();
        spinner.update(&randomizer_default_config().with("choices", ConfigValue::Text(" a, ,b ".into())));
        let pick = spinner.on_action("spin");
        let value = pick[0].value.as_str().unwrap();
        assert!(value == "a" || value == "b");

        spinner.update(&randomizer_default_config().with("choices", ConfigValue::Text("".into())));
        assert!(spinner.on_action("spin").is_empty());
    }

    #[test]
    fn long_picks_are_cut_to_fit_the_wheel() {
        let mut spinner = RandomizerContent::new();
        spinner.update(
            &randomizer_default_config()
                .with("last_pick", ConfigValue::Text("Grüße an die ganze Nachbarschaft".into())),
        );
        let frame = spinner.render(spinner.natural_size());
        let label = frame.texts().find(|t| t.ends_with('…')).unwrap();
        assert_eq!(label.chars().count(), MAX_CHOICE_CHARS);
        assert_eq!(label, "Grüße an die ganz…");

        spinner.update(&randomizer_default_config().with("last_pick", ConfigValue::Text("Blue".into())));
        assert!(spinner.render(spinner.natural_size()).texts().any(|t| t == "Blue"));
    }
}
