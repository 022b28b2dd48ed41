//! Agent personas and task prompts for the LLM text source.
//!
//! Centralising every prompt here keeps [`crate::pipeline::llm`] free of
//! wording: it only knows how to run an ordered list of [`TaskSpec`]s.
//! Unit tests can inspect the plans directly without a provider.
//!
//! Personas are plain `'static` records, built at compile time and never
//! mutated, so they are shared freely between concurrent requests.

use crate::config::AnalysisMode;

/// Who answers a task: rendered into the system message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentPersona {
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

impl AgentPersona {
    /// The system message for this persona.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a {}.\n\nGoal: {}\n\n{}\n\n{}",
            self.role, self.goal, self.backstory, SAFETY_RULES
        )
    }
}

/// One step of a sequential plan: an instruction plus the shape of its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    /// Stable task name used in logs, progress events, and errors.
    pub name: &'static str,
    pub agent: &'static AgentPersona,
    /// Instruction; `{query}` is replaced with the caller's query.
    pub description: &'static str,
    pub expected_output: &'static str,
}

impl TaskSpec {
    /// Build the user message for this task.
    ///
    /// `prior` holds `(task name, output)` pairs from earlier steps so later
    /// specialists can build on the doctor's findings.
    pub fn user_prompt(&self, query: &str, report_text: &str, prior: &[(&str, &str)]) -> String {
        let mut prompt = self.description.replace("{query}", query);
        prompt.push_str("\n\nExpected output:\n");
        prompt.push_str(self.expected_output);
        prompt.push_str("\n\nBlood test report text:\n\"\"\"\n");
        prompt.push_str(report_text);
        prompt.push_str("\n\"\"\"");
        for (name, output) in prior {
            prompt.push_str(&format!("\n\nContext from the previous task ({name}):\n\"\"\"\n{output}\n\"\"\""));
        }
        prompt
    }
}

/// Appended to every persona's system message.
pub const SAFETY_RULES: &str = "Always state that the analysis is informational and does not replace \
consultation with a qualified healthcare provider. Do not invent values that are not present in \
the report. Output plain text only; do not wrap the answer in code fences.";

pub static DOCTOR: AgentPersona = AgentPersona {
    role: "Senior Medical Doctor and Blood Test Analyst",
    goal: "Analyze blood test reports accurately and provide professional medical insights",
    backstory: "You are an experienced medical doctor with 15+ years of experience in laboratory \
medicine. You interpret blood test results against normal reference ranges and explain any \
abnormalities clearly, always prioritising patient safety.",
};

pub static NUTRITIONIST: AgentPersona = AgentPersona {
    role: "Clinical Nutritionist and Dietitian",
    goal: "Provide evidence-based nutrition recommendations based on blood test results",
    backstory: "You are a registered dietitian trained in medical nutrition therapy. You correlate \
blood biomarkers with nutritional status and give practical, science-based dietary advice.",
};

pub static EXERCISE_SPECIALIST: AgentPersona = AgentPersona {
    role: "Clinical Exercise Physiologist",
    goal: "Design safe and effective exercise programs based on blood test results",
    backstory: "You are a certified clinical exercise physiologist. You understand how blood \
markers relate to exercise capacity and safety, and you favour gradual, well-monitored progression.",
};

pub static HELP_PATIENTS: TaskSpec = TaskSpec {
    name: "help_patients",
    agent: &DOCTOR,
    description: "Analyze the user's blood test report and provide medical insights for their query: {query}

Your analysis should include:
1. Review of key blood markers and their values
2. Identification of any values outside normal reference ranges
3. Clinical significance of abnormal findings
4. General health recommendations based on the results
5. Suggestions for follow-up or monitoring if needed",
    expected_output: "A blood test analysis with a summary of key findings, explanation of abnormal \
values, a general health assessment, follow-up recommendations, and a clear disclaimer, written \
in language suitable for patients.",
};

pub static NUTRITION_ANALYSIS: TaskSpec = TaskSpec {
    name: "nutrition_analysis",
    agent: &NUTRITIONIST,
    description: "Analyze the blood test report to provide evidence-based nutrition recommendations for the user's query: {query}

Focus on:
1. Blood markers related to nutritional status (glucose, lipids, vitamins, minerals)
2. Dietary changes that address deficiencies or imbalances
3. Foods to emphasize or limit
4. Practical meal planning suggestions",
    expected_output: "Nutrition recommendations covering the relevant markers, foods to emphasize \
and limit, meal planning tips, and a timeline for reassessment.",
};

pub static EXERCISE_PLANNING: TaskSpec = TaskSpec {
    name: "exercise_planning",
    agent: &EXERCISE_SPECIALIST,
    description: "Create a safe and effective exercise program based on the blood test results and the user's query: {query}

Consider:
1. Current health status as indicated by blood markers
2. Contraindications or precautions
3. Appropriate intensity, duration, and frequency
4. A progression plan with monitoring guidelines",
    expected_output: "An exercise program with readiness assessment, specific recommendations \
(type, intensity, duration, frequency), safety considerations, and a progressive weekly plan.",
};

/// The ordered task plan for `mode`.
///
/// Verification has no plan: it always answers with the static approval
/// template and never consults the LLM.
pub fn task_plan(mode: AnalysisMode) -> &'static [&'static TaskSpec] {
    static COMPREHENSIVE: [&TaskSpec; 3] = [&HELP_PATIENTS, &NUTRITION_ANALYSIS, &EXERCISE_PLANNING];
    static NUTRITION: [&TaskSpec; 2] = [&HELP_PATIENTS, &NUTRITION_ANALYSIS];
    static EXERCISE: [&TaskSpec; 2] = [&HELP_PATIENTS, &EXERCISE_PLANNING];

    match mode {
        AnalysisMode::Comprehensive => &COMPREHENSIVE,
        AnalysisMode::Nutrition => &NUTRITION,
        AnalysisMode::Exercise => &EXERCISE,
        AnalysisMode::Verification => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(mode: AnalysisMode) -> Vec<&'static str> {
        task_plan(mode).iter().map(|t| t.name).collect()
    }

    #[test]
    fn plans_per_mode() {
        assert_eq!(
            names(AnalysisMode::Comprehensive),
            vec!["help_patients", "nutrition_analysis", "exercise_planning"]
        );
        assert_eq!(names(AnalysisMode::Nutrition), vec!["help_patients", "nutrition_analysis"]);
        assert_eq!(names(AnalysisMode::Exercise), vec!["help_patients", "exercise_planning"]);
        assert!(names(AnalysisMode::Verification).is_empty());
    }

    #[test]
    fn user_prompt_carries_query_report_and_context() {
        let p = NUTRITION_ANALYSIS.user_prompt(
            "Is my diet OK?",
            "Cholesterol: 245",
            &[("help_patients", "LDL is elevated")],
        );
        assert!(p.contains("for the user's query: Is my diet OK?"));
        assert!(p.contains("Cholesterol: 245"));
        assert!(p.contains("Context from the previous task (help_patients)"));
        assert!(p.contains("LDL is elevated"));
        assert!(!p.contains("{query}"));
    }

    #[test]
    fn system_prompt_includes_role_and_safety_rules() {
        let s = DOCTOR.system_prompt();
        assert!(s.starts_with("You are a Senior Medical Doctor"));
        assert!(s.contains(SAFETY_RULES));
    }
}
