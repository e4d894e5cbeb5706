//! Time-of-day greetings.
//!
//! Each language has a fixed set of greetings; the first one embeds a
//! morning / afternoon / generic salutation chosen from the local hour.
//! [`GreetingPicker`] picks one at random but never the same one twice in a
//! row.

use kiosk_types::Language;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GREETING_COUNT: usize = 3;

/// Part of the day, from the local hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Morning,
    Afternoon,
    Other,
}

impl DayPart {
    /// Before noon is morning, before 18:00 is afternoon.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Other,
        }
    }
}

fn salutation(language: Language, part: DayPart) -> &'static str {
    match (language, part) {
        (Language::Thai, DayPart::Morning) => "สวัสดีตอนเช้าครับ",
        (Language::Thai, DayPart::Afternoon) => "สวัสดีตอนบ่ายครับ",
        (Language::Thai, DayPart::Other) => "สวัสดีครับ",
        (Language::English, DayPart::Morning) => "Good morning",
        (Language::English, DayPart::Afternoon) => "Good afternoon",
        (Language::English, DayPart::Other) => "Good day",
    }
}

fn greeting(language: Language, part: DayPart, index: usize) -> String {
    let hello = salutation(language, part);
    match (language, index) {
        (Language::Thai, 0) => format!("{hello} มีอะไรให้น้องนำทางช่วยไหมครับ?"),
        (Language::Thai, 1) => {
            "สำนักงานขนส่งพยัคฆภูมิพิสัยสวัสดีครับ สอบถามข้อมูลกับน้องนำทางได้นะครับ".to_string()
        }
        (Language::Thai, _) => "สอบถามข้อมูลเบื้องต้นกับน้องนำทางได้นะครับ".to_string(),
        (Language::English, 0) => format!("{hello}! How can I help you today?"),
        (Language::English, 1) => "Welcome! Please feel free to ask any questions.".to_string(),
        (Language::English, _) => {
            "Please feel free to ask me for any basic information.".to_string()
        }
    }
}

/// Random greeting selection without immediate repeats.
#[derive(Debug)]
pub struct GreetingPicker {
    rng: StdRng,
    last: Option<usize>,
}

impl GreetingPicker {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic picker for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self { rng, last: None }
    }

    /// Pick a greeting for `language` at local `hour`.
    pub fn pick(&mut self, language: Language, hour: u32) -> String {
        let index = match self.last {
            // Draw from the other slots and shift past the previous pick.
            Some(last) => {
                let i = self.rng.gen_range(0..GREETING_COUNT - 1);
                if i >= last { i + 1 } else { i }
            }
            None => self.rng.gen_range(0..GREETING_COUNT),
        };
        self.last = Some(index);
        greeting(language, DayPart::from_hour(hour), index)
    }
}

impl Default for GreetingPicker {
    fn default() -> Self {
        Self::new()
    }
}
