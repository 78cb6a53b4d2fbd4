//! The closed set of AST node types.
//!
//! Each type has a `type` tag written into default nodes and a callback name
//! under which a builder override is looked up.

macro_rules! ast_types {
    (
        $( $variant:ident => $tag:literal, $callback:literal; )*
        @xml {
            $( $xvariant:ident => $xtag:literal, $xcallback:literal; )*
        }
    ) => {
        /// An AST node type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum AstType {
            $( $variant, )*
            $( #[cfg(feature = "e4x")] $xvariant, )*
        }

        impl AstType {
            /// Every node type, in table order.
            pub const ALL: &'static [AstType] = &[
                $( AstType::$variant, )*
                $( #[cfg(feature = "e4x")] AstType::$xvariant, )*
            ];

            /// The `type` tag of nodes of this type.
            pub fn type_name(self) -> &'static str {
                match self {
                    $( AstType::$variant => $tag, )*
                    $( #[cfg(feature = "e4x")] AstType::$xvariant => $xtag, )*
                }
            }

            /// The builder property consulted for an override.
            pub fn callback_name(self) -> &'static str {
                match self {
                    $( AstType::$variant => $callback, )*
                    $( #[cfg(feature = "e4x")] AstType::$xvariant => $xcallback, )*
                }
            }
        }
    };
}

ast_types! {
    Program => "Program", "program";
    Identifier => "Identifier", "identifier";
    Literal => "Literal", "literal";
    Property => "Property", "property";

    FunctionDeclaration => "FunctionDeclaration", "functionDeclaration";
    VariableDeclaration => "VariableDeclaration", "variableDeclaration";
    VariableDeclarator => "VariableDeclarator", "variableDeclarator";

    SequenceExpression => "SequenceExpression", "sequenceExpression";
    ConditionalExpression => "ConditionalExpression", "conditionalExpression";
    UnaryExpression => "UnaryExpression", "unaryExpression";
    BinaryExpression => "BinaryExpression", "binaryExpression";
    AssignmentExpression => "AssignmentExpression", "assignmentExpression";
    LogicalExpression => "LogicalExpression", "logicalExpression";
    UpdateExpression => "UpdateExpression", "updateExpression";
    NewExpression => "NewExpression", "newExpression";
    CallExpression => "CallExpression", "callExpression";
    MemberExpression => "MemberExpression", "memberExpression";
    FunctionExpression => "FunctionExpression", "functionExpression";
    ArrayExpression => "ArrayExpression", "arrayExpression";
    SpreadExpression => "SpreadExpression", "spreadExpression";
    ObjectExpression => "ObjectExpression", "objectExpression";
    ThisExpression => "ThisExpression", "thisExpression";
    ComprehensionExpression => "ComprehensionExpression", "comprehensionExpression";
    GeneratorExpression => "GeneratorExpression", "generatorExpression";
    YieldExpression => "YieldExpression", "yieldExpression";
    LetExpression => "LetExpression", "letExpression";

    EmptyStatement => "EmptyStatement", "emptyStatement";
    BlockStatement => "BlockStatement", "blockStatement";
    ExpressionStatement => "ExpressionStatement", "expressionStatement";
    LabeledStatement => "LabeledStatement", "labeledStatement";
    IfStatement => "IfStatement", "ifStatement";
    SwitchStatement => "SwitchStatement", "switchStatement";
    WhileStatement => "WhileStatement", "whileStatement";
    DoWhileStatement => "DoWhileStatement", "doWhileStatement";
    ForStatement => "ForStatement", "forStatement";
    ForInStatement => "ForInStatement", "forInStatement";
    ForOfStatement => "ForOfStatement", "forOfStatement";
    BreakStatement => "BreakStatement", "breakStatement";
    ContinueStatement => "ContinueStatement", "continueStatement";
    WithStatement => "WithStatement", "withStatement";
    ReturnStatement => "ReturnStatement", "returnStatement";
    TryStatement => "TryStatement", "tryStatement";
    ThrowStatement => "ThrowStatement", "throwStatement";
    DebuggerStatement => "DebuggerStatement", "debuggerStatement";
    LetStatement => "LetStatement", "letStatement";

    SwitchCase => "SwitchCase", "switchCase";
    CatchClause => "CatchClause", "catchClause";
    ComprehensionBlock => "ComprehensionBlock", "comprehensionBlock";

    ArrayPattern => "ArrayPattern", "arrayPattern";
    ObjectPattern => "ObjectPattern", "objectPattern";
    PropertyPattern => "PropertyPattern", "propertyPattern";

    @xml {
        XmlAnyName => "XMLAnyName", "xmlAnyName";
        XmlQualifiedIdentifier => "XMLQualifiedIdentifier", "xmlQualifiedIdentifier";
        XmlFunctionQualifiedIdentifier => "XMLFunctionQualifiedIdentifier", "xmlFunctionQualifiedIdentifier";
        XmlAttributeSelector => "XMLAttributeSelector", "xmlAttributeSelector";
        XmlFilterExpression => "XMLFilterExpression", "xmlFilterExpression";
        XmlDefaultDeclaration => "XMLDefaultDeclaration", "xmlDefaultDeclaration";
        XmlElement => "XMLElement", "xmlElement";
        XmlList => "XMLList", "xmlList";
        XmlEscape => "XMLEscape", "xmlEscape";
        XmlText => "XMLText", "xmlText";
        XmlStartTag => "XMLStartTag", "xmlStartTag";
        XmlEndTag => "XMLEndTag", "xmlEndTag";
        XmlPointTag => "XMLPointTag", "xmlPointTag";
        XmlName => "XMLName", "xmlName";
        XmlAttribute => "XMLAttribute", "xmlAttribute";
        XmlCdata => "XMLCdata", "xmlCdata";
        XmlComment => "XMLComment", "xmlComment";
        XmlProcessingInstruction => "XMLProcessingInstruction", "xmlProcessingInstruction";
    }
}

impl AstType {
    /// Look up a node type by its callback name.
    pub fn from_callback_name(name: &str) -> Option<AstType> {
        AstType::ALL.iter().copied().find(|t| t.callback_name() == name)
    }
}
