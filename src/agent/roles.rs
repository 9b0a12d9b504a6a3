use serde::{Deserialize, Serialize};

/// Dispatch target for one chat message. Chosen per request by the entry
/// point the caller used; no role transition persists across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Router: lets the remote agent decide whether the content is
    /// customer- or finance-related and delegate internally.
    General,
    /// Forces the customer-information specialist.
    Customer,
    /// Forces the financial-data specialist.
    Finance,
}

impl AgentRole {
    /// Remote agent name, matching what the hosted runtime registers.
    pub fn agent_name(&self) -> &'static str {
        match self {
            Self::General => "root_agent",
            Self::Customer => "customer_info_agent",
            Self::Finance => "finances_agent",
        }
    }

    /// Instruction block forwarded with every request to this role.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::General => {
                "You are the main routing agent. Analyze the user's message and any \
                 uploaded file text, decide whether it contains customer information \
                 (names, emails, phones, addresses, contact details) or financial data \
                 (amounts, transactions, payments, invoices, account numbers), and \
                 delegate to the matching specialist. If both are present, prioritize \
                 the primary intent; if unclear, ask the user what kind of data they \
                 want to enter."
            }
            Self::Customer => {
                "You are a specialist for customer information. Extract every available \
                 customer detail (name, email, phone, address, company, notes) from the \
                 message or uploaded file text, report each extracted customer as a \
                 structured record, and confirm what was entered. Note what is missing \
                 rather than inventing values."
            }
            Self::Finance => {
                "You are a specialist for financial data. Extract every available \
                 financial detail (amount, currency, transaction type, date, \
                 description, category, notes) from the message or uploaded file text, \
                 report each item as a structured record, and confirm what was entered. \
                 Be precise with amounts and dates."
            }
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::General => "general",
            Self::Customer => "customer",
            Self::Finance => "finance",
        };
        f.write_str(name)
    }
}
