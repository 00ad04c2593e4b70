use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::mcp::figure::{self, AxisValue, Figure, FigureError};

// Tool parameter structures
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
pub struct LineChartParams {
    /// A nested list containing each set of x-values to include in the chart
    pub x: Vec<Vec<f64>>,
    /// A nested list containing each set of y-values to include in the chart
    pub y: Vec<Vec<f64>>,
    /// A nested list of custom data attached to each data point, shown when hovering over it
    #[serde(default)]
    pub custom_data: Option<Vec<Vec<serde_json::Value>>>,
    /// The dataset label to associate with each pair of x and y arrays
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    /// Title to add to the chart
    #[serde(default)]
    pub title: Option<String>,
    /// The labels to be added to the x and y axes
    #[serde(default)]
    pub axes_labels: Option<AxesLabels>,
    /// Smooth the lines with spline interpolation
    #[serde(default)]
    pub spline: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct AxesLabels {
    pub x: Option<String>,
    pub y: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
pub struct BarChartParams {
    /// The list of categories for the x-axis of the chart
    pub x: Vec<String>,
    /// The value associated with each category, describing the bar height
    pub y: Vec<f64>,
    /// Optional hover text for each bar, one entry per category
    #[serde(default)]
    pub hover_labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
pub struct HeatMapParams {
    /// The x values for the x-axis, numerical or categorical
    pub x: Vec<AxisValue>,
    /// The y values for the y-axis, numerical or categorical
    pub y: Vec<AxisValue>,
    /// One row per y value, each holding one intensity per x value
    pub z: Vec<Vec<f64>>,
}

/// MCP server exposing the Plotly chart builders as tools.
#[derive(Clone)]
pub struct ChartMcpService {
    pub tool_router: ToolRouter<ChartMcpService>,
}

impl Default for ChartMcpService {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartMcpService {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    /// Serialize a figure as the tool's text content
    pub fn figure_result(
        &self,
        tool: &str,
        figure: Result<Figure, FigureError>,
    ) -> Result<CallToolResult, McpError> {
        let json = figure.and_then(|f| f.to_json()).map_err(|e| {
            warn!(tool, error = %e, "chart tool rejected its input");
            self.format_error(tool, e)
        })?;
        debug!(tool, bytes = json.len(), "chart tool produced figure");
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    pub fn format_error(&self, tool: &str, error: FigureError) -> McpError {
        match error {
            FigureError::Serialize(_) => McpError::internal_error(
                format!("{tool}: {error}"),
                Some(json!({ "tool": tool })),
            ),
            _ => McpError::invalid_params(format!("{tool}: {error}"), Some(json!({ "tool": tool }))),
        }
    }
}

#[tool_router]
impl ChartMcpService {
    #[tool(
        description = "Generate a line chart containing one or more traces of data. A line chart is ideal for data that changes continuously, such as values over time: tracking trends, comparing several variables over the same period, revealing seasonality or cycles, and showing volatility. Pass one x list and one y list per trace."
    )]
    pub fn line_plot(
        &self,
        Parameters(params): Parameters<LineChartParams>,
    ) -> Result<CallToolResult, McpError> {
        self.figure_result("line_plot", figure::line_figure(&params))
    }

    #[tool(
        description = "Generate a bar chart. Takes categories as \"x\" and the count or value of each category as \"y\". A bar chart compares values of discrete categories using bars whose height corresponds to the measured value."
    )]
    pub fn bar_chart(
        &self,
        Parameters(params): Parameters<BarChartParams>,
    ) -> Result<CallToolResult, McpError> {
        self.figure_result("bar_chart", figure::bar_figure(&params))
    }

    #[tool(
        description = "Generate a heat map from x, y and z values. A heat map shows the intensity of values across a two-dimensional grid using a colour scale, which makes patterns and hotspots easy to spot. z has one row per y value and one entry per x value."
    )]
    pub fn heat_map(
        &self,
        Parameters(params): Parameters<HeatMapParams>,
    ) -> Result<CallToolResult, McpError> {
        self.figure_result("heat_map", figure::heat_map_figure(&params))
    }
}

#[tool_handler]
impl ServerHandler for ChartMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server provides Plotly chart tools. Each tool returns a figure as JSON."
                    .to_string(),
            ),
        }
    }
}
