use crate::models::{EmotionCount, MoodEntry, MoodSummary};

pub const DEFAULT_COLOR: &str = "#f2f4f8";
pub const ADVICE: &str = "Keep tracking your emotions.";
pub const STREAK_ALERT: &str = "You've recorded negative emotions 3 times in a row. Consider resting, going outside, or talking to someone you trust.";
pub const STREAK_THRESHOLD: usize = 3;

pub const NEGATIVE_EMOTIONS: [&str; 5] = ["Sad", "Lonely", "Overwhelmed", "Anxious", "Disappointed"];

static EMOTION_COLORS: [(&str, &str); 20] = [
    ("Happy", "#FFF9D6"),
    ("Excited", "#FFF9D6"),
    ("Calm", "#E6F2FF"),
    ("Relaxed", "#E6F2FF"),
    ("Grateful", "#FFEFD8"),
    ("Motivated", "#FFEFD8"),
    ("Proud", "#FFE6F0"),
    ("Loved", "#FFE6F0"),
    ("Sad", "#EEF2F7"),
    ("Lonely", "#EEF2F7"),
    ("Angry", "#FFE5E5"),
    ("Stressed", "#F3E8FF"),
    ("Overwhelmed", "#F3E8FF"),
    ("Anxious", "#E6FAF7"),
    ("Tired", "#F4F4F4"),
    ("Bored", "#F4F4F4"),
    ("Confused", "#F4F4F4"),
    ("Okay", "#F4F4F4"),
    ("Frustrated", "#FFE5E5"),
    ("Disappointed", "#EEF2F7"),
];

/// Every label the dashboard offers in its emotion picker.
pub fn known_emotions() -> impl Iterator<Item = &'static str> {
    EMOTION_COLORS.iter().map(|(emotion, _)| *emotion)
}

pub fn color_for(emotion: &str) -> &'static str {
    EMOTION_COLORS
        .iter()
        .find(|(label, _)| *label == emotion)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}

pub fn is_negative(emotion: &str) -> bool {
    NEGATIVE_EMOTIONS.contains(&emotion)
}

/// Derives the dashboard summary from a user's moods, newest first.
pub fn build_summary(moods: &[MoodEntry]) -> MoodSummary {
    let histogram = histogram(moods);
    let dominant_emotion = dominant(&histogram);

    let color = moods
        .first()
        .map(|latest| color_for(&latest.emotion))
        .unwrap_or(DEFAULT_COLOR)
        .to_string();

    let negative_streak = moods
        .iter()
        .take_while(|mood| is_negative(&mood.emotion))
        .count();
    let streak_alert =
        (negative_streak >= STREAK_THRESHOLD).then(|| STREAK_ALERT.to_string());

    let mut chart_labels = Vec::with_capacity(moods.len());
    let mut chart_intensities = Vec::with_capacity(moods.len());
    for mood in moods.iter().rev() {
        chart_labels.push(mood.timestamp.format("%m-%d").to_string());
        chart_intensities.push(mood.intensity);
    }

    MoodSummary {
        histogram,
        dominant_emotion,
        color,
        negative_streak,
        streak_alert,
        advice: ADVICE.to_string(),
        chart_labels,
        chart_intensities,
    }
}

fn histogram(moods: &[MoodEntry]) -> Vec<EmotionCount> {
    let mut counts: Vec<EmotionCount> = Vec::new();
    for mood in moods {
        match counts.iter_mut().find(|entry| entry.emotion == mood.emotion) {
            Some(entry) => entry.count += 1,
            None => counts.push(EmotionCount {
                emotion: mood.emotion.clone(),
                count: 1,
            }),
        }
    }
    counts
}

// Strictly-greater keeps the earliest label on ties.
fn dominant(histogram: &[EmotionCount]) -> Option<String> {
    let mut best: Option<&EmotionCount> = None;
    for entry in histogram {
        if best.is_none_or(|current| entry.count > current.count) {
            best = Some(entry);
        }
    }
    best.map(|entry| entry.emotion.clone())
}
