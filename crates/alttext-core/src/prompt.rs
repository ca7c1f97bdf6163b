//! Prompt assembly from vision provider output.
//!
//! Each vendor response becomes a one-paragraph summary of what was
//! detected, followed by the same alt-text instruction.

use crate::config::VisionConfig;
use crate::vision::azure::ImageAnalysis;
use crate::vision::google::AnnotateImageResponse;
use crate::vision::rekognition::DetectLabelsResponse;
use crate::vision::Analysis;

/// Instruction appended to every provider summary.
pub const ALT_TEXT_INSTRUCTION: &str = "\n\nGenerate a detailed and concise alt text for this image, let the text begin with `This image shows`: ";

const REKOGNITION_PREFIX: &str = "This image contains the following labels: ";
const INFORMATION_PREFIX: &str = "The image contains the following information: ";

/// Builds completion prompts with the configured confidence thresholds.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// Rekognition labels must exceed this (0-100)
    rekognition_min_confidence: f32,
    /// Google annotations must exceed this (0-1)
    google_min_score: f32,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&VisionConfig::default())
    }
}

impl PromptBuilder {
    pub fn new(rekognition_min_confidence: f32, google_min_score: f32) -> Self {
        Self {
            rekognition_min_confidence,
            google_min_score,
        }
    }

    pub fn from_config(config: &VisionConfig) -> Self {
        Self::new(config.rekognition.min_confidence, config.google.min_score)
    }

    /// Full prompt: provider summary followed by the alt-text instruction.
    pub fn build(&self, analysis: &Analysis) -> String {
        let mut prompt = self.summary(analysis);
        prompt.push_str(ALT_TEXT_INSTRUCTION);
        prompt
    }

    /// Provider summary without the instruction.
    pub fn summary(&self, analysis: &Analysis) -> String {
        match analysis {
            Analysis::Rekognition(resp) => self.rekognition(resp),
            Analysis::Google(resp) => self.google(resp),
            Analysis::Azure(resp) => azure(resp),
        }
    }

    fn rekognition(&self, resp: &DetectLabelsResponse) -> String {
        let names: Vec<&str> = resp
            .labels
            .iter()
            .filter(|label| label.confidence > self.rekognition_min_confidence)
            .map(|label| label.name.as_str())
            .collect();
        format!("{REKOGNITION_PREFIX}{}. ", names.join(", "))
    }

    fn google(&self, resp: &AnnotateImageResponse) -> String {
        let min = self.google_min_score;
        let mut prompt = INFORMATION_PREFIX.to_string();

        let labels: Vec<&str> = resp
            .label_annotations
            .iter()
            .filter(|a| a.score > min)
            .map(|a| a.description.as_str())
            .collect();
        push_section(&mut prompt, "Labels", &labels.join(", "));

        let landmarks: Vec<&str> = resp
            .landmark_annotations
            .iter()
            .filter(|a| a.score > min)
            .map(|a| a.description.as_str())
            .collect();
        push_section(&mut prompt, "Landmarks", &landmarks.join(", "));

        let faces: Vec<_> = resp
            .face_annotations
            .iter()
            .filter(|f| f.detection_confidence > min)
            .collect();
        if !faces.is_empty() {
            let mut expressions: Vec<&str> = Vec::new();
            for expression in faces.iter().flat_map(|f| f.likely_expressions()) {
                if !expressions.contains(&expression) {
                    expressions.push(expression);
                }
            }
            let mut text = format!("{} detected", faces.len());
            if !expressions.is_empty() {
                text.push_str(&format!(", expressions: {}", expressions.join(", ")));
            }
            push_section(&mut prompt, "Faces", &text);
        }

        // The first text annotation is the full detected text; the rest are single words.
        if let Some(text) = resp.text_annotations.first() {
            let text = text.description.split_whitespace().collect::<Vec<_>>().join(" ");
            push_section(&mut prompt, "Text", &text);
        }

        let objects: Vec<&str> = resp
            .localized_object_annotations
            .iter()
            .filter(|o| o.score > min)
            .map(|o| o.name.as_str())
            .collect();
        push_section(&mut prompt, "Objects", &dedup(objects).join(", "));

        prompt
    }
}

fn azure(resp: &ImageAnalysis) -> String {
    let mut prompt = INFORMATION_PREFIX.to_string();

    let categories: Vec<&str> = resp.categories.iter().map(|c| c.name.as_str()).collect();
    push_section(&mut prompt, "Categories", &categories.join(", "));

    if let Some(description) = &resp.description {
        if let Some(caption) = description.captions.first() {
            push_section(&mut prompt, "Description", &caption.text);
        }
        push_section(&mut prompt, "Tags", &description.tags.join(", "));
    }

    if let Some(color) = resp.color.as_ref().and_then(|c| c.dominant_color_foreground.as_deref()) {
        push_section(&mut prompt, "Dominant Color", color);
    }

    prompt
}

/// Append `"<name>: <value>. "`, skipping empty values.
fn push_section(prompt: &mut String, name: &str, value: &str) {
    if !value.is_empty() {
        prompt.push_str(&format!("{name}: {value}. "));
    }
}

/// Drop repeated names (Google reports one object per instance).
fn dedup(names: Vec<&str>) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
