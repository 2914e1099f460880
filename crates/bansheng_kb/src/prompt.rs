//! Prompt Assembler
//!
//! Builds the system prompt for the language model: a fixed persona
//! template filled with the caller's pregnancy context, plus an optional
//! reference-data section listing retrieved facts one per line.
//! Pure string building; no I/O.

use serde::{Deserialize, Serialize};

use crate::pregnancy::{baby_size, format_week_display, trimester_name, PregnancyContext};
use crate::types::{EmergencyFact, EmotionalFact, FoodFact, SymptomFact};

pub const MAX_PROMPT_FOODS: usize = 5;
pub const MAX_PROMPT_SYMPTOMS: usize = 3;
pub const MAX_PROMPT_EMOTIONAL: usize = 3;

/// Facts retrieved for one message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KbPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foods: Vec<FoodFact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<SymptomFact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emotional: Vec<EmotionalFact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency: Option<EmergencyFact>,
}

impl KbPayload {
    pub fn is_empty(&self) -> bool {
        self.emergency.is_none()
            && self.foods.is_empty()
            && self.symptoms.is_empty()
            && self.emotional.is_empty()
    }
}

/// Base persona prompt with the caller's context
pub fn build_system_prompt(context: &PregnancyContext) -> String {
    let size = baby_size(context.current_week);
    let trimester = trimester_name(context.trimester);

    let warning_section = if context.warning_signs.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = context
            .warning_signs
            .iter()
            .map(|s| format!("- {}", s))
            .collect();
        format!("本周需要注意的危险信号：\n{}", lines.join("\n"))
    };

    format!(
        r#"你是"伴生"，一个专为准爸爸设计的孕期助手。你的角色是可靠的大哥——简洁、专业、给出可行动的建议。

## 当前状态
- 孕周：第{week}周第{day}天（{trimester}）
- 距离预产期：{days}天
- 宝宝大小：{size}（{comparison}，约{weight}）

{warnings}

## 回复原则
1. 简洁直接，不说废话。每句话都要有价值。
2. 给出具体可行动的建议，告诉他"现在就可以做什么"。
3. 涉及危险信号时，立即给出行动指令，不要犹豫。
4. 语气温暖但不啰嗦，像一个靠谱的老大哥。
5. 用"你"称呼用户，用"她"称呼他的伴侣。
6. 不要使用emoji，保持专业。

## 回复格式
- 如果是简单问题，直接回答。
- 如果涉及症状，先判断紧急程度，再给建议。
- 如果需要多步骤，用数字列表。
- 重要信息可以用"⚠️"或"✅"标注。"#,
        week = context.current_week,
        day = context.current_day,
        trimester = trimester,
        days = context.days_until_due,
        size = size.size,
        comparison = size.comparison,
        weight = size.weight,
        warnings = warning_section,
    )
}

/// One-line header: `第N周第D天 • comparison`
pub fn build_context_summary(context: &PregnancyContext) -> String {
    format!(
        "{} • {}",
        format_week_display(context.current_week, context.current_day),
        baby_size(context.current_week).comparison
    )
}

pub fn format_food(food: &FoodFact) -> String {
    let mut line = format!("- 【{}】安全等级：{}", food.name, food.safety_level);
    if !food.reason.is_empty() {
        line.push_str(&format!("｜{}", food.reason));
    }
    if !food.dad_tip.is_empty() {
        line.push_str(&format!("｜爸提示：{}", food.dad_tip));
    }
    line
}

pub fn format_symptom(symptom: &SymptomFact) -> String {
    let first_question = symptom.questions.first().map(String::as_str).unwrap_or("");
    let rules = symptom
        .decision_rules
        .iter()
        .take(2)
        .map(|r| format!("{}→{}({})", r.condition, r.action, r.urgency))
        .collect::<Vec<_>>()
        .join("；");
    format!("- 【{}】首问：{}｜决策：{}", symptom.name, first_question, rules)
}

pub fn format_emotional(scenario: &EmotionalFact) -> String {
    let mut line = format!(
        "- 【{}】正确回应：{}",
        scenario.scenario_name, scenario.right_response
    );
    if !scenario.follow_up_actions.is_empty() {
        line.push_str(&format!("｜后续：{}", scenario.follow_up_actions));
    }
    line
}

pub fn format_emergency(emergency: &EmergencyFact) -> String {
    let signs = emergency
        .recognition_signs
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join("；");
    let actions = emergency
        .immediate_actions
        .iter()
        .take(4)
        .cloned()
        .collect::<Vec<_>>()
        .join("；");
    format!(
        "⚠️【紧急：{}】识别：{}｜立即执行：{}",
        emergency.name, signs, actions
    )
}

/// Base prompt, plus a reference-data section when anything was retrieved
pub fn build_kb_augmented_prompt(context: &PregnancyContext, payload: &KbPayload) -> String {
    let base = build_system_prompt(context);
    if payload.is_empty() {
        return base;
    }

    let mut lines = Vec::new();
    if let Some(emergency) = &payload.emergency {
        lines.push(format_emergency(emergency));
    }
    lines.extend(payload.foods.iter().take(MAX_PROMPT_FOODS).map(format_food));
    lines.extend(payload.symptoms.iter().take(MAX_PROMPT_SYMPTOMS).map(format_symptom));
    lines.extend(payload.emotional.iter().take(MAX_PROMPT_EMOTIONAL).map(format_emotional));

    format!(
        "{}\n\n## 知识库参考数据\n{}\n\n使用说明：\n- 仅基于上述事实回答，勿编造。\n- 若包含紧急信息，先给行动指令，再解释。\n- 无匹配项时按常规知识简洁回答。",
        base,
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecisionRule, SafetyLevel, Urgency};

    fn context() -> PregnancyContext {
        PregnancyContext {
            current_week: 20,
            current_day: 3,
            trimester: 2,
            days_until_due: 138,
            warning_signs: Vec::new(),
        }
    }

    fn crab() -> FoodFact {
        FoodFact {
            id: "food_螃蟹".to_string(),
            name: "螃蟹".to_string(),
            name_en: "Crab".to_string(),
            category: "海鲜".to_string(),
            safety_level: SafetyLevel::Caution,
            reason: "易致敏".to_string(),
            dad_tip: String::new(),
            trimester_notes: None,
        }
    }

    fn emergency() -> EmergencyFact {
        EmergencyFact {
            id: "emergency_water_break".to_string(),
            name: "破水".to_string(),
            name_en: String::new(),
            recognition_signs: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            immediate_actions: vec!["1".into(), "2".into(), "3".into(), "4".into(), "5".into()],
            what_not_to_do: Vec::new(),
            when_to_call_ambulance: Vec::new(),
            hospital_bag_items: Vec::new(),
            reassurance_script: String::new(),
        }
    }

    #[test]
    fn test_base_prompt_interpolates_context() {
        let prompt = build_system_prompt(&context());
        assert!(prompt.starts_with("你是\"伴生\""));
        assert!(prompt.contains("孕周：第20周第3天（孕中期）"));
        assert!(prompt.contains("距离预产期：138天"));
        assert!(prompt.contains("宝宝大小：16.4cm（一根香蕉，约300g）"));
        assert!(!prompt.contains("危险信号：\n"));
    }

    #[test]
    fn test_warning_signs_rendered() {
        let ctx = context().with_warning_signs(vec!["持续头痛".to_string()]);
        let prompt = build_system_prompt(&ctx);
        assert!(prompt.contains("本周需要注意的危险信号：\n- 持续头痛"));
    }

    #[test]
    fn test_empty_payload_returns_base() {
        let ctx = context();
        assert_eq!(
            build_kb_augmented_prompt(&ctx, &KbPayload::default()),
            build_system_prompt(&ctx)
        );
    }

    #[test]
    fn test_emergency_rendered_first() {
        let payload = KbPayload {
            foods: vec![crab()],
            emergency: Some(emergency()),
            ..KbPayload::default()
        };
        let prompt = build_kb_augmented_prompt(&context(), &payload);
        let section = prompt.split("## 知识库参考数据\n").nth(1).unwrap();
        let mut lines = section.lines();
        assert_eq!(
            lines.next(),
            Some("⚠️【紧急：破水】识别：a；b；c｜立即执行：1；2；3；4")
        );
        assert_eq!(lines.next(), Some("- 【螃蟹】安全等级：CAUTION｜易致敏"));
        assert!(prompt.ends_with("- 无匹配项时按常规知识简洁回答。"));
    }

    #[test]
    fn test_payload_is_capped() {
        let payload = KbPayload {
            foods: vec![crab(); 8],
            ..KbPayload::default()
        };
        let prompt = build_kb_augmented_prompt(&context(), &payload);
        assert_eq!(prompt.matches("【螃蟹】").count(), MAX_PROMPT_FOODS);
    }

    #[test]
    fn test_symptom_line_uses_first_two_rules() {
        let rule = |c: &str, u| DecisionRule {
            condition: c.to_string(),
            action: "做".to_string(),
            urgency: u,
            triggers: Vec::new(),
        };
        let symptom = SymptomFact {
            id: "s".to_string(),
            name: "头痛".to_string(),
            name_en: String::new(),
            questions: vec!["视物模糊吗？".to_string()],
            decision_rules: vec![
                rule("甲", Urgency::Emergency),
                rule("乙", Urgency::Monitor),
                rule("丙", Urgency::Normal),
            ],
            dad_actions: Vec::new(),
        };
        assert_eq!(
            format_symptom(&symptom),
            "- 【头痛】首问：视物模糊吗？｜决策：甲→做(EMERGENCY)；乙→做(MONITOR)"
        );
    }

    #[test]
    fn test_context_summary() {
        assert_eq!(build_context_summary(&context()), "第20周第3天 • 一根香蕉");
    }
}
