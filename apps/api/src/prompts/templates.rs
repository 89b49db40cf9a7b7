// Prompt templates for every model task. Placeholders are `{name}` and are filled
// by `prompts::render`, which never re-expands text it has already inserted.

/// Batch scoring. Expects `{job_description}` and `{resumes}`.
pub const SCORING_PROMPT: &str = r#"You are an expert technical recruiter and hiring manager with years of experience. Your task is to analyze a list of resumes against a given job description and provide a structured JSON output.

JOB DESCRIPTION:
{job_description}

RESUMES TO ANALYZE:
{resumes}

INSTRUCTIONS:
1. Carefully read the Job Description to understand the key requirements, skills, and experience needed.
2. For each resume, perform the following analysis:
   a. Identify the candidate's name. If no name is found, use the filename or "Unknown Candidate".
   b. Calculate a "matchScore" from 1 to 10, where 1 is a very poor match and 10 is a perfect match. The score must be based on how well the candidate's skills and experience align with the requirements of the job description.
   c. Write a concise "justification" (2-3 sentences) explaining the reasoning behind the matchScore.
   d. Extract a list of the most relevant "extractedSkills" from the resume that match the job description.
   e. Provide a brief "extractedExperienceSummary" (2-3 sentences) summarizing their relevant work history.
3. Return exactly one object per resume, using the resume ID from the input as "id".
4. You MUST respond with a valid JSON array and no text outside the JSON array. Do not use markdown formatting. Each object in the array must have this schema:
{
  "id": "string (the resume ID from the input)",
  "name": "string",
  "matchScore": "number (integer from 1-10)",
  "justification": "string",
  "extractedSkills": ["string"],
  "extractedExperienceSummary": "string"
}"#;

/// Delimited block for one resume inside [`SCORING_PROMPT`].
pub const RESUME_BLOCK: &str = "--- RESUME START ---\nID: {id}\nFILENAME: {file_name}\n\n{text}\n--- RESUME END ---";

/// Single-resume Q&A. Expects `{job_description}`, `{resume_text}`, `{question}`.
pub const RESUME_QUESTION_PROMPT: &str = r#"You are an expert career coach and hiring manager. Your task is to provide insightful answers to questions about a candidate's resume, considering the context of a specific job description. Be helpful, insightful, and constructive. Go beyond what is just written in the resume and provide strategic advice.

JOB DESCRIPTION CONTEXT:
{job_description}

CANDIDATE'S RESUME:
{resume_text}

USER'S QUESTION:
{question}

YOUR INSIGHTFUL ANSWER:"#;

/// Consultant chat. Expects `{job_description}`, `{resume_file_names}`, `{history}`.
pub const CONSULTANT_PROMPT: &str = r#"You are an AI-powered Career and Recruitment Consultant. You have been provided with the context of a job description, a list of resume filenames that have been uploaded, and the current conversation history. Your goal is to provide expert advice.

CONTEXT:
- Job Description: {job_description}
- Resumes Uploaded: {resume_file_names}
- Conversation History:
{history}

Based on all available context, provide a helpful and concise answer to the user's last message. Do not repeat the context in your answer."#;

/// Resume generation. Expects the personal detail fields plus pre-rendered
/// `{experience}` and `{education}` sections.
pub const RESUME_GENERATION_PROMPT: &str = r#"You are a professional resume writer. Your task is to generate a complete, well-formatted resume in plain text based on the structured data provided by a user. Use strong action verbs and a professional tone.

USER DATA:
- Full Name: {full_name}
- Email: {email}
- Phone Number: {phone_number}
- Address: {address}
- Professional Summary: {summary}
- Work Experience:
{experience}
- Education:
{education}
- Skills: {skills}

Generate the complete resume text based on the data above. Ensure clean formatting with clear headings (e.g., SUMMARY, WORK EXPERIENCE, EDUCATION, SKILLS). Do not include any introductory or concluding text. Just provide the resume content itself."#;

pub const EXPERIENCE_BLOCK: &str = "Company: {company}\nJob Title: {job_title}\nDates: {start_date} - {end_date}\nResponsibilities:\n{responsibilities}";

pub const EDUCATION_BLOCK: &str = "School: {school}\nDegree: {degree}\nDates: {start_date} - {end_date}";
