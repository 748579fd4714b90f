// ==========================================
// SMART CALDA - 领域类型定义
// ==========================================
// 职责: 封闭枚举（运输状态 / 班次 / 作业状态 / O.S. 分类）
// 红线: 所有自由文本状态必须经解析器进入枚举，禁止裸字符串流转
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 文本规范化：去首尾空白、转小写、折叠葡语重音字符
///
/// 表头匹配与状态解析共用同一规则，保证 "Disponível" 与 "disponivel" 等价
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

// ==========================================
// 运输状态 (Trip Status)
// ==========================================
// 持久化格式沿用历史标签: ENTREGUE / DISPONIVEL / SEM INFO.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TripStatus {
    Delivered, // 已送达
    Available, // 待运输
    #[default]
    Unknown, // 无信息
}

impl TripStatus {
    pub const DELIVERED_LABEL: &'static str = "ENTREGUE";
    pub const AVAILABLE_LABEL: &'static str = "DISPONIVEL";
    pub const UNKNOWN_LABEL: &'static str = "SEM INFO.";

    /// 历史标签
    pub fn label(&self) -> &'static str {
        match self {
            TripStatus::Delivered => Self::DELIVERED_LABEL,
            TripStatus::Available => Self::AVAILABLE_LABEL,
            TripStatus::Unknown => Self::UNKNOWN_LABEL,
        }
    }

    /// 从自由文本解析状态
    ///
    /// # 规则
    /// - 空白 / "-" → Unknown
    /// - 含 "entregue" 或 "ok" → Delivered
    /// - 含 "disponivel" 或 "pendente" → Available
    /// - 其他 → Unknown
    pub fn from_free_text(raw: &str) -> Self {
        let text = normalize_text(raw);
        if text.is_empty() || text.chars().all(|c| c == '-') {
            return TripStatus::Unknown;
        }
        if text.contains("entregue") || text.contains("ok") {
            TripStatus::Delivered
        } else if text.contains("disponivel") || text.contains("pendente") {
            TripStatus::Available
        } else {
            TripStatus::Unknown
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, TripStatus::Delivered)
    }

    /// 人工切换：仅在 ENTREGUE 与 DISPONIVEL 之间翻转
    ///
    /// SEM INFO. 视为未送达，切换后为 ENTREGUE
    pub fn toggled(&self) -> Self {
        match self {
            TripStatus::Delivered => TripStatus::Available,
            TripStatus::Available | TripStatus::Unknown => TripStatus::Delivered,
        }
    }
}

impl From<String> for TripStatus {
    fn from(raw: String) -> Self {
        TripStatus::from_free_text(&raw)
    }
}

impl From<TripStatus> for String {
    fn from(status: TripStatus) -> Self {
        status.label().to_string()
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==========================================
// 班次 (Shift)
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shift {
    #[default]
    #[serde(rename = "Turno A")]
    TurnoA,
    #[serde(rename = "Turno B")]
    TurnoB,
    #[serde(rename = "Turno C")]
    TurnoC,
}

impl Shift {
    pub fn label(&self) -> &'static str {
        match self {
            Shift::TurnoA => "Turno A",
            Shift::TurnoB => "Turno B",
            Shift::TurnoC => "Turno C",
        }
    }

    /// 宽松解析: "Turno B" / "turno b" / "B" / "Shift B"
    pub fn parse(raw: &str) -> Option<Self> {
        let text = normalize_text(raw);
        let code = text
            .trim_start_matches("turno")
            .trim_start_matches("shift")
            .trim();
        match code {
            "a" => Some(Shift::TurnoA),
            "b" => Some(Shift::TurnoB),
            "c" => Some(Shift::TurnoC),
            _ => None,
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==========================================
// 作业状态 (Operation Status)
// ==========================================
// 粗粒度生命周期标记，与计算进度无关
// 持久化格式沿用葡语描述，兼容 MIXING 等代码写法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    #[default]
    #[serde(rename = "Em processo de mistura", alias = "MIXING")]
    Mixing, // 调配中
    #[serde(rename = "A caminho da área", alias = "EN_ROUTE")]
    EnRoute, // 运输途中
    #[serde(rename = "Operação concluída", alias = "COMPLETED")]
    Completed, // 已完成
}

impl OperationStatus {
    pub fn code(&self) -> &'static str {
        match self {
            OperationStatus::Mixing => "MIXING",
            OperationStatus::EnRoute => "EN_ROUTE",
            OperationStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ==========================================
// O.S. 分类 (OS Category)
// ==========================================
// 每次读取时重新计算，不落库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OsCategory {
    NoData,     // 无运输记录
    InProgress, // 执行中
    Completed,  // 已完成
}

impl OsCategory {
    /// 是否计入“活跃”序列（NO_DATA ∪ IN_PROGRESS）
    pub fn is_active(&self) -> bool {
        !matches!(self, OsCategory::Completed)
    }
}

impl fmt::Display for OsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsCategory::NoData => write!(f, "NO_DATA"),
            OsCategory::InProgress => write!(f, "IN_PROGRESS"),
            OsCategory::Completed => write!(f, "COMPLETED"),
        }
    }
}
