/// The different tokenizer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    DataState,
    CharacterReferenceState,
    NamedCharacterReferenceState,
    NumericCharacterReferenceState,
    HexadecimalCharacterReferenceStartState,
    DecimalCharacterReferenceStartState,
    HexadecimalCharacterReferenceState,
    DecimalCharacterReferenceState,
    NumericCharacterReferenceEndState,
    RcDataState,
    RcDataLessThanSignState,
    RcDataEndTagOpenState,
    RcDataEndTagNameState,
    RawTextState,
    RawTextLessThanSignState,
    RawTextEndTagOpenState,
    RawTextEndTagNameState,
    PlaintextState,
    TagOpenState,
    EndTagOpenState,
    TagNameState,
    BeforeAttributeNameState,
    AttributeNameState,
    AfterAttributeNameState,
    BeforeAttributeValueState,
    AttributeValueDoubleQuotedState,
    AttributeValueSingleQuotedState,
    AttributeValueUnquotedState,
    AfterAttributeValueQuotedState,
    SelfClosingStartState,
    BogusCommentState,
    MarkupDeclarationOpenState,
    CommentStartState,
    CommentStartDashState,
    CommentState,
    CommentEndDashState,
    CommentEndState,
    CommentEndBangState,
    DocTypeState,
    BeforeDocTypeNameState,
    DocTypeNameState,
    AfterDocTypeNameState,
    BogusDocTypeState,
}
