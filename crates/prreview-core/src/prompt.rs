//! Prompt sent to the model for one file.
//!
//! Uses the Llama 3 chat template: one system turn carrying the reviewer
//! instructions and the material, then an open assistant turn.

const SYSTEM_HEADER: &str = "<|begin_of_text|><|start_header_id|>system<|end_header_id|>";
const ASSISTANT_HEADER: &str = "<|eot_id|><|start_header_id|>assistant<|end_header_id|>";

const INSTRUCTIONS: &str = "\
You are a highly experienced Senior Code Reviewer. Your task is to review a code diff for a single file and provide constructive feedback to help developers improve their skills. Use the following information and instructions:

REVIEW PROCESS:
- Analyze the code diff thoroughly for the given file.
- Check for compliance with the provided checklist.
- Identify both issues and good practices.
- Prioritize findings by severity (Critical, Major, Minor).
- Apply clean code principles and best practices.

FOR EACH ISSUE:
- Location: Specify the line number within the file.
- Explanation: Describe why it's problematic and its potential impact.
- Suggestion: Offer a specific improvement, including code examples where appropriate.
- Severity: Categorize as Critical, Major, or Minor.

ADDITIONAL GUIDELINES:
- Be thorough but constructive. Aim to educate, not discourage.
- Consider performance, readability, maintainability, and best practices.
- If the checklist seems irrelevant to the changes, focus on common issues like null pointer exceptions, naming conventions, code cleanliness, and appropriate design patterns.
- Highlight any particularly good code practices you notice.
- Consider the specific context of the file being reviewed.";

const OUTPUT_FORMAT: &str = r#"OUTPUT FORMAT:
Based on the provided code diff and checklist for a single file, generate a comprehensive code review following the above format and guidelines.
Provide your review as a JSON object with the following structure (Provide only a valid JSON, nothing else):
{
    "file_name": "path/to/file.ext",
    "general_assessment": "Overall evaluation of the code quality and main areas for improvement",
    "positive_aspects": [
        "List of good practices or well-written parts of the code"
    ],
    "issues": [
        {
            "severity": "Critical/Major/Minor",
            "line": line_number,
            "description": "Detailed explanation of the issue",
            "suggestion": "Specific improvement recommendation, including code example if applicable"
        }
    ],
    "checklist_violations": [
        {
            "item": "Specific checklist item that was violated",
            "explanation": "Why this item was not followed and its importance",
            "recommendation": "How to address this violation"
        }
    ]
}
EXAMPLE OUTPUT (truncated for brevity):
{
    "file_name": "main.py",
    "general_assessment": "The code shows a good understanding of basic concepts, but there are several areas for improvement in terms of error handling and code organization.",
    "positive_aspects": [
        "Consistent naming convention for variables",
        "Good use of comments to explain complex logic"
    ],
    "issues": [
        {
            "severity": "Major",
            "line": 23,
            "description": "Potential null pointer exception. The 'user' object is not checked for null before accessing its properties.",
            "suggestion": "Add a null check before accessing 'user' properties. Example: if user is not None:"
        }
    ],
    "checklist_violations": [
        {
            "item": "Error handling",
            "explanation": "The code lacks proper error handling in several critical sections.",
            "recommendation": "Implement try-except blocks for potential exceptions, especially in file operations and network calls."
        }
    ]
}"#;

/// Build the review prompt for `file_name`.
pub fn build_review_prompt(file_name: &str, checklist: &str, file_diff: &str) -> String {
    let mut prompt = String::with_capacity(
        INSTRUCTIONS.len() + OUTPUT_FORMAT.len() + checklist.len() + file_diff.len() + 256,
    );

    prompt.push_str(SYSTEM_HEADER);
    prompt.push('\n');
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "Review the following file: {file_name}\n\nChecklist:\n{checklist}\n\nDiff:\n{file_diff}"
    ));
    prompt.push_str("\n\n");
    prompt.push_str(OUTPUT_FORMAT);
    prompt.push_str("\n\n");
    prompt.push_str(ASSISTANT_HEADER);
    prompt.push('\n');
    prompt
}
