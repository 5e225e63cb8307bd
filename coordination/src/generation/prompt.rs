//! Prompt assembly and candidate header rendering.

use super::GenerationRequest;
use crate::lineage::HashDigest;

/// Hex characters of the pre-round origin shown in a candidate header.
const SEED_PREFIX_LEN: usize = 12;

/// Line-comment marker for a file type. Candidate headers are written with
/// it and consensus grouping strips lines that start with it.
pub fn comment_marker(file_type: &str) -> &'static str {
    match file_type.trim().to_ascii_lowercase().as_str() {
        "python" | "py" | "ruby" | "rb" | "shell" | "bash" | "sh" | "zsh" | "yaml" | "yml"
        | "toml" | "perl" | "r" | "dockerfile" | "makefile" => "#",
        "sql" | "lua" | "haskell" | "hs" => "--",
        _ => "//",
    }
}

/// Full prompt sent to the backend for one agent call.
pub fn render_prompt(request: &GenerationRequest) -> String {
    let strategy = format!(
        "Apply recursive reasoning (depth {}) and fractal code structure.",
        request.reasoning_depth
    );

    format!(
        "You are an expert coding agent (Agent ID: {agent}, Model: {model}).\n\
         You are in round {round} of a multi-agent consensus.\n\
         Your assigned strategy is: \"{strategy}\".\n\
         Analyze the user's request and the provided code to generate an improved or new code snippet.\n\n\
         USER REQUEST: \"{prompt}\"\n\n\
         CODE CONTEXT ({file_type}):\n\
         ```\n{context}\n```\n\n\
         Provide ONLY the generated code snippet as your response. \
         Do not include explanations, apologies, or markdown formatting.",
        agent = request.agent_id,
        model = request.model,
        round = request.round + 1,
        prompt = request.prompt,
        file_type = request.file_type,
        context = request.context,
    )
}

/// Stored candidate for a successful call: two header lines, then the code.
pub fn render_candidate(
    marker: &str,
    agent_id: &str,
    model: &str,
    round: u32,
    origin: &HashDigest,
    code: &str,
) -> String {
    format!(
        "{marker} Agent: {agent_id} | Model: {model} | Round: {}\n{marker} Seed: {}\n{}",
        round + 1,
        origin.short(SEED_PREFIX_LEN),
        code.trim()
    )
}

/// Placeholder candidate for a failed call.
///
/// The last line is not a comment, so the placeholder survives
/// normalization and forms its own group keyed by agent and round.
pub fn render_failure(marker: &str, agent_id: &str, round: u32, error: &str) -> String {
    format!(
        "{marker} Agent {agent_id} failed to generate a response.\n\
         {marker} Error: Generation failed for agent {agent_id}: {error}\n\
         [generation failed: {agent_id}, round {}]",
        round + 1
    )
}
